use clap::Parser;
use std::process;
use virtual_memory_sim::config::Config;
use virtual_memory_sim::{logging, run_simulation};

fn init_msg() {
    println!("virtual memory simulation");
}

fn main() {
    let config = Config::parse();
    if let Err(err) = logging::init(config.log_level) {
        eprintln!("error: {err}");
    }

    init_msg();
    config.display();
    println!();

    match run_simulation(&config) {
        Ok(stats) => println!("{}", stats),
        Err(err) => {
            eprintln!("error: {err}");
            process::exit(1);
        }
    }
}
