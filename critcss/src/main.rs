use clap::Parser;
use critcss_lib::{extract, ExtractOptions, Url};
use std::fs;

#[derive(Parser)]
#[command(name = "critcss")]
#[command(about = "Extract the critical CSS from an HTML document")]
struct Args {
    /// Input HTML file.
    input: String,

    /// Output HTML file.
    output: String,

    /// Also write the extracted CSS to this file.
    #[arg(long)]
    css: Option<String>,

    /// Base URL for resolving relative stylesheet links.
    #[arg(long)]
    base: Option<String>,

    /// Keep CSS and HTML output unminified.
    #[arg(long)]
    no_minify: bool,
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let args: Args = Args::parse();

    let html = match fs::read_to_string(&args.input) {
        Ok(html) => html,
        Err(e) => {
            eprintln!("Error reading HTML file: {}", e);
            std::process::exit(1);
        }
    };

    let base_url = match args.base.as_deref().map(Url::parse) {
        None => None,
        Some(Ok(url)) => Some(url),
        Some(Err(e)) => {
            eprintln!("Error parsing base URL: {}", e);
            std::process::exit(1);
        }
    };

    let options = ExtractOptions {
        html: Some(html),
        minify: !args.no_minify,
        base_url,
        ..Default::default()
    };

    let result = match extract(options).await {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error extracting critical CSS: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = fs::write(&args.output, &result.html) {
        eprintln!("Error writing HTML file: {}", e);
        std::process::exit(1);
    }

    match args.css {
        Some(path) => {
            if let Err(e) = fs::write(&path, &result.css) {
                eprintln!("Error writing CSS file: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Extracted {} bytes of critical CSS.", result.css.len());
        }
    }
}
