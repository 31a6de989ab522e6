use statpanel::{
    app::{self, App},
    cli::Command,
    Result,
};

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match Command::parse(&args) {
        Ok(Command::ShowHelp) => {
            Command::print_help();
            Ok(())
        }
        Ok(Command::ShowVersion) => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Ok(Command::Run(opts)) => App::from_options(&opts)?.run(),
        Ok(Command::TestPattern(opts)) => App::from_options(&opts)?.test_pattern(),
        Ok(Command::TouchProbe { opts, seconds }) => App::from_options(&opts)?.touch_probe(seconds),
        Ok(Command::Stats) => {
            println!("{}", app::dump_stats()?);
            Ok(())
        }
        Err(err) => {
            Command::print_help();
            Err(err)
        }
    }
}
