use chess_core::worker::SearchWorker;
use gloo_worker::Registrable;

fn main() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Debug);
    log::info!("Search worker starting");
    SearchWorker::registrar().register();
}
