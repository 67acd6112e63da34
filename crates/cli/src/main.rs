use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fintellect_core::domain::{Answers, Variant};
use fintellect_core::format;
use fintellect_core::gateway::http::HttpGateway;
use fintellect_core::gateway::Gateway;
use fintellect_core::session::Session;
use fintellect_core::shaping::Dashboard;
use fintellect_core::view::{ProfileSummary, SessionView, StageView};

#[derive(Debug, Parser)]
#[command(name = "fintellect_cli")]
struct Args {
    /// Print the final session view as JSON instead of a report.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Profile, configure and analyze one set of answers.
    Run {
        /// Free-text answer; pass exactly three, in question order.
        #[arg(long = "answer", required = true)]
        answers: Vec<String>,

        /// Variant to switch to after the baseline weights are computed.
        #[arg(long)]
        variant: Option<Variant>,
    },
    /// Check that the scoring service is reachable.
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = fintellect_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    let gateway = HttpGateway::from_settings(&settings)?;

    let result = match args.command {
        Command::Run { answers, variant } => {
            let answers = parse_answers(answers)?;
            run(&gateway, answers, variant, args.json).await
        }
        Command::Health => health(&gateway, args.json).await,
    };

    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
        tracing::error!(error = %err, "run failed");
    }
    result
}

fn parse_answers(answers: Vec<String>) -> anyhow::Result<Answers> {
    let count = answers.len();
    let answers: [String; 3] = answers
        .try_into()
        .map_err(|_| anyhow::anyhow!("expected exactly three --answer values, got {count}"))?;
    Ok(Answers::from(answers))
}

async fn run(
    gateway: &dyn Gateway,
    answers: Answers,
    variant: Option<Variant>,
    json: bool,
) -> anyhow::Result<()> {
    let mut session = Session::default();

    session.submit_answers(gateway, answers).await?;
    ensure_no_failure(&session)?;

    if let Some(variant) = variant.filter(|v| *v != session_variant(&session)) {
        session.select_variant(gateway, variant).await?;
        ensure_no_failure(&session)?;
    }

    session.proceed(gateway).await?;
    ensure_no_failure(&session)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&SessionView::of(&session))?);
        return Ok(());
    }

    if let Some(profile) = session.state().profile() {
        print_profile(&ProfileSummary::from(profile));
    }
    if let Some(weights) = session.state().weights() {
        println!("\nAllocation ({} variant)", session.state().selected_variant());
        for (asset, w) in weights.iter() {
            println!("  {:<16} {}", format::humanize(asset), format::weight_pct(*w));
        }
    }
    if let Some(dashboard) = session.dashboard() {
        print_dashboard(&dashboard);
    }
    Ok(())
}

fn session_variant(session: &Session) -> Variant {
    session
        .configuring()
        .map(|engine| engine.selected())
        .unwrap_or_default()
}

/// Turns the active stage's failed request into an error carrying its user-facing message.
fn ensure_no_failure(session: &Session) -> anyhow::Result<()> {
    let (StageView::Profiling { request, .. }
    | StageView::Configuring { request, .. }
    | StageView::Reviewing { request, .. }) = SessionView::of(session).view;
    match request.error {
        Some(message) => anyhow::bail!(message),
        None => Ok(()),
    }
}

fn print_profile(summary: &ProfileSummary) {
    println!("{} (score {}/100)", summary.label, summary.score);
    for row in &summary.details {
        println!("  {:<20} {}", row.label, row.value);
    }
    for axis in &summary.axes {
        println!("  {:<20} {}", axis.name, axis.value);
    }
}

fn print_dashboard(dashboard: &Dashboard) {
    println!(
        "\n{:<14} {:>9} {:>11} {:>9} {:>11} {:>10}",
        "Portfolio", "CAGR", "Volatility", "Max DD", "Worst 12m", "Recovery"
    );
    for row in &dashboard.table {
        let marker = if row.highlighted { "*" } else { " " };
        println!(
            "{marker}{:<13} {:>9} {:>11} {:>9} {:>11} {:>10}",
            row.name, row.cagr, row.volatility, row.max_drawdown, row.worst_12m, row.recovery
        );
        if let Some(note) = &row.variant_note {
            println!("  ({note})");
        }
    }

    println!("\nGrowth of {}", format::currency(1.0));
    for series in &dashboard.growth.datasets {
        if let Some(last) = series.data.last() {
            println!("  {:<14} {}", series.label, format::currency(*last));
        }
    }

    if !dashboard.comparisons.is_empty() {
        println!("\nInsights");
        for line in &dashboard.comparisons {
            println!("  - {line}");
        }
    }

    for card in &dashboard.cards {
        println!("\n{}", card.name);
        for line in &card.allocation {
            println!("  {:<16} {}", format::humanize(&line.asset), line.weight);
        }
        if !card.explanation.is_empty() {
            println!("  {}", card.explanation);
        }
    }
}

async fn health(gateway: &dyn Gateway, json: bool) -> anyhow::Result<()> {
    let health = gateway.health_check().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&health)?);
    } else {
        println!(
            "{}: {}",
            health.service.as_deref().unwrap_or("scoring service"),
            health.status
        );
    }
    Ok(())
}

fn init_sentry(settings: &fintellect_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_variant() {
        let args = Args::try_parse_from([
            "fintellect_cli",
            "run",
            "--answer",
            "I would hold",
            "--answer",
            "steady growth",
            "--answer",
            "no major expenses",
            "--variant",
            "Aggressive",
        ])
        .unwrap();
        let Command::Run { answers, variant } = args.command else {
            panic!("expected run");
        };
        assert_eq!(variant, Some(Variant::Aggressive));
        assert_eq!(
            parse_answers(answers).unwrap(),
            Answers::new("I would hold", "steady growth", "no major expenses")
        );
    }

    #[test]
    fn wrong_answer_count_is_an_error() {
        let err = parse_answers(vec!["only one".to_string()]).unwrap_err();
        assert!(err.to_string().contains("got 1"));
    }

    #[test]
    fn unknown_variant_is_rejected_by_parser() {
        let parsed = Args::try_parse_from([
            "fintellect_cli",
            "run",
            "--answer",
            "a",
            "--variant",
            "reckless",
        ]);
        assert!(parsed.is_err());
    }
}
