use advisor_reference_orchestrator::{agent::ReferenceAgent, config::Settings};
use tracing::info;
use tracing_subscriber::EnvFilter;

const SAMPLE_SITUATION: &str = "RRSP funds sitting in savings account earning minimal returns. Need ETF portfolio recommendations.";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::from_env()?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let situation = if args.is_empty() {
        SAMPLE_SITUATION.to_string()
    } else {
        args.join(" ")
    };

    info!("Advisor Reference Orchestrator starting");

    let agent = ReferenceAgent::from_settings(&settings)?;

    match agent.generate_report(&situation).await {
        Ok(report) => {
            println!("\n=== ADVISOR REFERENCE ===");
            println!("Request ID: {}", report.request_id);
            println!("Elapsed: {} ms", report.elapsed_ms);
            println!("\nSearch terms:");
            for query in report.queries.regulatory.iter().chain(report.queries.web.iter()) {
                println!("  [{:?}] {}", query.kind, query.text);
            }
            println!();
            println!("{}", report.document.to_markdown());
            Ok(())
        }
        Err(e) => {
            eprintln!("Reference generation failed: {}", e);
            Err(Box::new(e) as Box<dyn std::error::Error>)
        }
    }
}
