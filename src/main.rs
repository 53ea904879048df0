fn main() {
    if let Err(e) = plasmoscope_lib::run() {
        eprintln!("plasmoscope: {e}");
        std::process::exit(1);
    }
}
