//! Interface de terminal do shiptrack: spinners e saída colorida.
//!
//! Usa as crates `indicatif` para spinners de progresso e `console` para
//! estilização com cores. O [`ResolutionProgress`] acompanha visualmente
//! os eventos de uma resolução no terminal.

use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use crate::catalog::CandidateProvider;
use crate::error::ResolutionError;
use crate::events::ProgressEvent;
use crate::tracking::{ResolutionOutcome, TrackingResult, TrialState};

/// Indicador visual de progresso para uma resolução no terminal.
///
/// Exibe um spinner com a transportadora e a tentativa atuais, e uma linha
/// colorida por candidato concluído: verde para sucesso, vermelho para
/// falha e amarelo para rejeição ou erro de transporte.
pub struct ResolutionProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
}

impl ResolutionProgress {
    /// Inicia o spinner. Com `hidden`, nada é desenhado (usado com `--json`).
    pub fn start(reference: &str, hidden: bool) -> Self {
        let pb = ProgressBar::new_spinner();
        if hidden {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        } else {
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.cyan} {msg} [{elapsed}]")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.enable_steady_tick(Duration::from_millis(100));
        }
        pb.set_message(format!("resolving {reference}"));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    /// Consome eventos de `rx` até o evento `Resolved` de `request_id`.
    ///
    /// Eventos de outras requisições são ignorados; atrasos do canal apenas
    /// pulam mensagens intermediárias.
    pub async fn follow(&self, mut rx: broadcast::Receiver<ProgressEvent>, request_id: Uuid) {
        loop {
            match rx.recv().await {
                Ok(event) if event.request_id() == request_id => {
                    let done = matches!(event, ProgressEvent::Resolved { .. });
                    self.handle(&event);
                    if done {
                        break;
                    }
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
        }
    }

    /// Atualiza o spinner ou imprime a linha correspondente ao evento.
    pub fn handle(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::CandidateTerminal { state, .. } => {
                let style = match state {
                    TrialState::Succeeded => &self.green,
                    TrialState::CreateRejected | TrialState::TransportError => &self.yellow,
                    _ => &self.red,
                };
                self.pb.println(format!("  {}", style.apply_to(describe(event))));
            }
            ProgressEvent::Resolved { .. } => self.pb.finish_and_clear(),
            _ => self.pb.set_message(describe(event)),
        }
    }

    /// Finaliza o spinner e exibe o resumo da resolução bem-sucedida.
    pub fn complete(&self, outcome: &ResolutionOutcome) {
        self.pb.finish_and_clear();
        println!("  {} {}", self.green.apply_to("✓"), render_outcome(outcome));
        if let Some(result) = &outcome.result {
            println!("{}", render_result(result));
        }
    }

    pub fn fail(&self, err: &ResolutionError) {
        self.pb.finish_and_clear();
        println!("  {} {err}", self.red.apply_to("✗"));
        if let Some(outcome) = err.outcome() {
            for record in &outcome.per_candidate_log {
                let detail = record.error.as_deref().unwrap_or("-");
                println!("    {:<10} {:<15} {detail}", record.candidate, record.state);
            }
        }
    }
}

/// Texto curto de um evento, usado no spinner e nas linhas de candidato.
pub fn describe(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::CandidateStarted { candidate, .. } => format!("trying {candidate}"),
        ProgressEvent::CandidatePollTick {
            candidate,
            attempt,
            max_attempts,
            ..
        } => format!("{candidate}: poll {attempt}/{max_attempts}"),
        ProgressEvent::CandidateTerminal {
            candidate,
            state,
            error,
            ..
        } => match error {
            Some(error) => format!("{candidate}: {state} ({error})"),
            None => format!("{candidate}: {state}"),
        },
        ProgressEvent::Resolved { outcome, .. } => render_outcome(outcome),
    }
}

pub fn render_outcome(outcome: &ResolutionOutcome) -> String {
    match &outcome.winner {
        Some(winner) => format!(
            "{} resolved by {winner} after {} poll(s), {} carrier(s) tried",
            outcome.reference, outcome.attempts, outcome.candidates_tried
        ),
        None => format!(
            "{} unresolved, {} carrier(s) tried",
            outcome.reference, outcome.candidates_tried
        ),
    }
}

pub fn render_result(result: &TrackingResult) -> String {
    let mut lines = vec![
        format!("    carrier: {}", result.carrier_name),
        format!("    status:  {}", result.status_label),
    ];
    let origin = result.route.origin.as_deref().unwrap_or("?");
    let destination = result.route.destination.as_deref().unwrap_or("?");
    if result.route.origin.is_some() || result.route.destination.is_some() {
        lines.push(format!("    route:   {origin} -> {destination}"));
    }
    for date in &result.key_dates {
        lines.push(format!(
            "    {}: {}",
            date.label,
            date.date.as_deref().unwrap_or("-")
        ));
    }
    for unit in &result.sub_units {
        lines.push(format!("    container {} {}", unit.number, unit.status));
    }
    lines.join("\n")
}

pub fn print_carriers(providers: &[CandidateProvider]) {
    let bold = Style::new().bold();
    for provider in providers {
        let categories: Vec<_> = provider.categories.iter().map(|c| c.to_string()).collect();
        println!(
            "{:<10} {:<28} {}",
            bold.apply_to(&provider.id),
            provider.display_name,
            categories.join(", ")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::{CandidateId, Category, KeyDate, Route, TrackingRequest};
    use chrono::Utc;

    fn outcome(winner: Option<&str>) -> ResolutionOutcome {
        let req = TrackingRequest::auto_detect("DFSU7162007", Category::Container);
        ResolutionOutcome {
            request_id: req.request_id,
            reference: req.reference,
            category: req.category,
            mode: req.mode,
            winner: winner.map(CandidateId::new),
            attempts: 1,
            candidates_tried: 2,
            per_candidate_log: Vec::new(),
            result: None,
            job: None,
            budget_exhausted: false,
            started_at: Utc::now(),
            completed_at: Utc::now(),
            duration_ms: 0,
        }
    }

    #[test]
    fn render_outcome_names_winner() {
        assert_eq!(
            render_outcome(&outcome(Some("msc"))),
            "DFSU7162007 resolved by MSC after 1 poll(s), 2 carrier(s) tried"
        );
        assert_eq!(
            render_outcome(&outcome(None)),
            "DFSU7162007 unresolved, 2 carrier(s) tried"
        );
    }

    #[test]
    fn describe_terminal_includes_error() {
        let event = ProgressEvent::CandidateTerminal {
            request_id: Uuid::nil(),
            candidate: CandidateId::new("ONE"),
            state: TrialState::CreateRejected,
            error: Some("422".into()),
        };
        assert_eq!(describe(&event), "ONE: CreateRejected (422)");
    }

    #[test]
    fn render_result_lists_route_and_dates() {
        let result = TrackingResult {
            route: Route {
                origin: Some("Santos".into()),
                destination: None,
            },
            key_dates: vec![KeyDate {
                label: "ETA".into(),
                date: None,
            }],
            ..TrackingResult::empty(Category::Container)
        };
        let text = render_result(&result);
        assert!(text.contains("route:   Santos -> ?"));
        assert!(text.contains("ETA: -"));
    }

    #[tokio::test]
    async fn follow_stops_at_own_resolution() {
        let (tx, rx) = broadcast::channel(8);
        let done = outcome(Some("MSC"));
        let mine = done.request_id;
        tx.send(ProgressEvent::CandidateStarted {
            request_id: Uuid::new_v4(),
            candidate: CandidateId::new("ZIM"),
        })
        .unwrap();
        tx.send(ProgressEvent::Resolved {
            request_id: mine,
            outcome: Box::new(done),
        })
        .unwrap();

        let progress = ResolutionProgress::start("DFSU7162007", true);
        progress.follow(rx, mine).await;
    }
}
