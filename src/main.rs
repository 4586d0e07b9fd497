fn main() {
    if let Err(e) = surcor::cli::main() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
