fn main() {
    if let Err(e) = volumapper::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
