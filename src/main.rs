fn main() {
    if let Err(err) = datascope::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
