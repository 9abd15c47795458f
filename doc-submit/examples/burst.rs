use std::sync::Arc;
use std::time::Duration;

use doc_submit::Document;
use doc_submit::DocumentSubmitter;
use doc_submit::GateLayer;
use doc_submit::Submission;
use doc_submit::SubmissionResult;
use doc_submit::SubmitError;
use rate_gate::RateGate;
use reqwest::StatusCode;
use tokio::time::Instant;
use tokio::time::sleep;

#[tokio::main]
async fn main() -> Result<(), SubmitError> {
    // 1. A gate admitting 10 submissions per rolling second
    let gate = Arc::new(RateGate::new(Duration::from_secs(1), 10)?);

    // 2. Nobody waits longer than 1.5s for admission
    let layer = GateLayer::new(gate).with_max_wait(Duration::from_millis(1500));

    // 3. A stand-in for the registry
    let transport = tower::service_fn(|req: Submission| async move {
        sleep(Duration::from_millis(5)).await;
        Ok::<_, SubmitError>(SubmissionResult {
            status: StatusCode::CREATED,
            body: format!("{} bytes from {}", req.body.len(), req.signature),
        })
    });

    let submitter = DocumentSubmitter::with_layer(&layer, transport);

    println!("Submitting 30 documents, 10 per second, 1.5s admission budget\n");

    // 4. Fire everything at once: 20 get through, the rest run out of budget
    let start = Instant::now();
    let mut tasks = Vec::new();
    for i in 0..30 {
        let submitter = submitter.clone();
        tasks.push(tokio::spawn(async move {
            let signature = format!("client-{i:02}");
            let outcome = submitter.submit(&Document::default(), &signature).await;
            match outcome {
                Ok(result) => println!("[{i:03}] +{:.2?} {result}", start.elapsed()),
                Err(e) => println!("[{i:03}] +{:.2?} {e}", start.elapsed()),
            }
        }));
    }

    for task in tasks {
        let _ = task.await;
    }

    println!("\nDone in {:.2?}", start.elapsed());
    Ok(())
}
