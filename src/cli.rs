//! Interface de linha de comando do shiptrack baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (track, carriers, refresh)
//! e flags globais (--config, --max-attempts, --interval, --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::tracking::Category;

/// shiptrack: rastreamento de contêineres, BLs e bookings com detecção de transportadora.
#[derive(Debug, Parser)]
#[command(name = "shiptrack", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Arquivo de configuração (padrão: ./shiptrack.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Máximo de consultas por transportadora.
    #[arg(long, global = true)]
    pub max_attempts: Option<u32>,

    /// Intervalo entre consultas, em segundos.
    #[arg(long, global = true)]
    pub interval: Option<u64>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Categoria aceita pela CLI, mapeada para [`Category`] internamente.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CategoryArg {
    /// Número de contêiner.
    Container,
    /// Número de conhecimento de embarque (bill of lading).
    #[value(name = "bl", alias = "bill-of-lading")]
    BillOfLading,
    /// Número de booking.
    Booking,
}

impl From<CategoryArg> for Category {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Container => Category::Container,
            CategoryArg::BillOfLading => Category::BillOfLading,
            CategoryArg::Booking => Category::Booking,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Rastreia uma referência; sem --carrier, detecta a transportadora.
    Track {
        /// Número do contêiner, BL ou booking.
        reference: String,

        #[arg(long, value_enum)]
        category: CategoryArg,

        /// Transportadora a consultar (modo manual).
        #[arg(long)]
        carrier: Option<String>,

        /// Imprime o resultado completo em JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Lista as transportadoras candidatas.
    Carriers {
        #[arg(long, value_enum)]
        category: Option<CategoryArg>,
    },

    /// Pede ao provedor a atualização de um job já resolvido.
    Refresh {
        job_id: String,

        #[arg(long)]
        carrier: String,

        #[arg(long, value_enum)]
        category: CategoryArg,

        #[arg(long)]
        reference: String,

        #[arg(long, default_value_t = false)]
        json: bool,
    },
}
