fn main() {
    if let Err(err) = id_reconcile::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
