//! Sales report - export a business day's sales to xlsx and email it.

use sales_report::cli::Cli;
use sales_report::config::Config;
use sales_report::db::{PostgresSource, ReportSource};
use sales_report::error::Result;
use sales_report::logging;
use sales_report::mail::SmtpMailer;
use sales_report::pipeline::{run_report, PipelineOutcome};
use tracing::{error, info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    logging::init_stderr_logging();

    if let Err(e) = run().await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse_args();

    Config::load_dotenv(cli.env_file.as_deref())?;
    let config = Config::from_env()?;
    let request = cli.to_request();

    info!("Database: {}", config.database.display_string());
    info!("SMTP server: {}", config.smtp.display_string());

    let mailer = SmtpMailer::new(&config.smtp);

    let outcome = match PostgresSource::connect(&config.database).await {
        Ok(source) => {
            let outcome = run_report(&source, &mailer, &request, &cli.output_dir).await;
            if let Err(e) = source.close().await {
                warn!("Failed to close database connection: {e}");
            }
            outcome
        }
        Err(e) => {
            error!("Database connection or query failed: {e}");
            PipelineOutcome::QueryFailed(e)
        }
    };

    if !outcome.is_success() {
        warn!("Report for {} was not delivered", request.business_date);
    }

    Ok(())
}
