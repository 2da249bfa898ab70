fn main() {
    use clap::Parser;
    use std::error::Error;
    let args = websift::cli::Args::parse();
    websift::cli::setup_logging(args.verbose, args.quiet);
    if let Err(e) = websift::cli::run(&args) {
        eprintln!("{}", e);
        if args.verbose > 0 {
            let mut source = e.source();
            while let Some(s) = source {
                eprintln!("  cause: {}", s);
                source = s.source();
            }
        }
        std::process::exit(e.exit_code());
    }
}
