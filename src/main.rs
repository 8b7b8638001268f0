fn main() {
    if let Err(err) = archmap_layout::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
