fn main() {
    if let Err(e) = modstore_cli::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
