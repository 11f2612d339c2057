fn main() {
    if let Err(err) = energy_usage::app::run() {
        eprintln!("api startup failed: {err}");
        std::process::exit(1);
    }
}
