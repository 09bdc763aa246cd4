use std::process::ExitCode;

fn main() -> ExitCode {
    match wealth_tax_sim::app::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
