use std::env;
use std::error::Error;
use std::fs;
use std::process;

use log::{error, info};

use webharvest::{logger, Config, Orchestrator};

fn usage(program: &str) -> ! {
    eprintln!(
        "Usage: {} <command> <target> [num_results]\n\
         Commands:\n\
         \x20 extract  <url>            extract cleaned text and metadata\n\
         \x20 raw      <url>            fetch raw HTML plus title\n\
         \x20 search   <query> [n]      parse search results\n\
         \x20 research <query> [n]      search, then extract top results\n\
         \x20 batch    <file>           extract every URL listed in <file>",
        program
    );
    process::exit(2);
}

fn main() -> Result<(), Box<dyn Error>> {
    logger::init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("webharvest");
    if args.len() < 3 {
        usage(program);
    }

    let num_results: usize = args
        .get(3)
        .and_then(|n| n.parse().ok())
        .unwrap_or(10);

    let orchestrator = Orchestrator::new(Config::default());

    let json = match args[1].as_str() {
        "extract" => serde_json::to_string_pretty(&orchestrator.extract(&args[2], true))?,
        "raw" => serde_json::to_string_pretty(&orchestrator.extract(&args[2], false))?,
        "search" => serde_json::to_string_pretty(&orchestrator.search(&args[2], num_results))?,
        "research" => {
            serde_json::to_string_pretty(&orchestrator.search_and_extract(&args[2], num_results, true))?
        }
        "batch" => {
            let urls: Vec<String> = fs::read_to_string(&args[2])?
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect();
            info!("Loaded {} URLs from {}", urls.len(), args[2]);
            serde_json::to_string_pretty(&orchestrator.batch_extract(&urls, true))?
        }
        other => {
            error!("Unknown command: {}", other);
            usage(program);
        }
    };

    println!("{}", json);
    Ok(())
}
