#[tokio::main]
async fn main() {
    if let Err(e) = disease_predict_lib::run().await {
        // Tracing may not be installed yet when configuration fails.
        eprintln!("disease-predict: {e}");
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
