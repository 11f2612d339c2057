fn main() {
    if let Err(err) = energy_usage::app::run() {
        eprintln!("application startup failed: {err}");
        std::process::exit(1);
    }
}
