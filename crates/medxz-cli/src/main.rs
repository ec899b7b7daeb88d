mod cli;

fn main() {
    if let Err(e) = cli::run() {
        // Already shown to the user as a toast.
        if e.downcast_ref::<cli::Reported>().is_some() {
            std::process::exit(1);
        }
        eprintln!("{e:#}"); // pretty anyhow chain
        std::process::exit(1);
    }
}
