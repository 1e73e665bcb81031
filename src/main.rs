use clap::Parser;
use img_harvest::Scraper;

mod args;
use args::Args;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize logging; progress is shown unless RUST_LOG says otherwise
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            ::log::error!("Failed to load configuration: {}", e);
            return;
        }
    };

    println!("Note: scraping requires a WebDriver server (e.g., ChromeDriver).");
    println!(
        "Set WEBDRIVER_URL environment variable if not using {}",
        config.browser.webdriver_url
    );

    let start_time = std::time::Instant::now();
    let report = Scraper::new(&config.target_url)
        .with_config(config)
        .run()
        .await;

    if let Some(e) = &report.error {
        ::log::error!("An error occurred: {}", e);
    }
    println!();
    println!("{}", report.summary);

    ::log::info!(
        "Run finished in {:.2} seconds ({} images collected, {} skipped)",
        start_time.elapsed().as_secs_f64(),
        report.collected,
        report.summary.skipped()
    );
}
