//! Binary/streaming ingestion: length-prefixed frames over plain TCP.

use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};

use skytrace_proto::framing::{self, Ack};

use crate::pipeline::Pipelines;

/// Accept producer connections on `listener` until the process exits. Each
/// connection gets its own task; a frame is acked as soon as it is decoded
/// and enqueued, never after backend delivery.
pub async fn run_binary_listener(listener: TcpListener, pipelines: Arc<Pipelines>) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(err) => {
                tracing::warn!(
                    name: "ingest.binary_accept_failed",
                    error = %err,
                    "failed to accept producer connection"
                );
                continue;
            }
        };
        tracing::debug!(name: "ingest.binary_connected", peer = %peer, "producer connected");
        let pipelines = pipelines.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, pipelines).await {
                tracing::debug!(
                    name: "ingest.binary_connection_ended",
                    peer = %peer,
                    error = %err,
                    "producer connection ended with error"
                );
            }
        });
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    pipelines: Arc<Pipelines>,
) -> Result<(), skytrace_proto::ProtoError> {
    loop {
        match framing::read_frame(&mut stream).await {
            Ok(Some(request)) => {
                pipelines.dispatch_request(request);
                framing::write_ack(&mut stream, Ack::Ok).await?;
            }
            Ok(None) => return Ok(()),
            Err(err) => {
                // After a framing error the stream offset is unreliable;
                // answer once and drop the connection.
                let _ = framing::write_ack(&mut stream, Ack::Error).await;
                return Err(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Sink, SignalPipeline};
    use crate::retry::RetryPolicy;
    use async_trait::async_trait;
    use skytrace::export::ExportResult;
    use skytrace_proto::{export_request, ExportRequest, LogsPayload, TracesPayload};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug)]
    struct CountingSink(Arc<Mutex<usize>>);

    #[async_trait]
    impl Sink<LogsPayload> for CountingSink {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn deliver(&mut self, _payload: &LogsPayload) -> ExportResult {
            *self.0.lock().unwrap() += 1;
            Ok(())
        }
    }

    #[tokio::test]
    async fn frames_are_acked_and_dispatched() {
        let delivered = Arc::new(Mutex::new(0));
        let pipelines = Arc::new(Pipelines {
            traces: SignalPipeline::new("traces"),
            metrics: SignalPipeline::new("metrics"),
            logs: SignalPipeline::new("logs")
                .with_sink(CountingSink(delivered.clone()), RetryPolicy::default()),
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(run_binary_listener(listener, pipelines));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = ExportRequest {
            payload: Some(export_request::Payload::Logs(LogsPayload::default())),
        };
        framing::write_frame(&mut stream, &request).await.unwrap();
        assert_eq!(framing::read_ack(&mut stream).await.unwrap(), Ack::Ok);
        framing::write_frame(&mut stream, &request).await.unwrap();
        assert_eq!(framing::read_ack(&mut stream).await.unwrap(), Ack::Ok);

        for _ in 0..100 {
            if *delivered.lock().unwrap() == 2 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("payloads not delivered");
    }

    #[tokio::test]
    async fn trace_frames_route_to_the_trace_pipeline() {
        #[derive(Debug)]
        struct TraceCounter(Arc<Mutex<usize>>);

        #[async_trait]
        impl Sink<TracesPayload> for TraceCounter {
            fn name(&self) -> &'static str {
                "counting"
            }

            async fn deliver(&mut self, _payload: &TracesPayload) -> ExportResult {
                *self.0.lock().unwrap() += 1;
                Ok(())
            }
        }

        let delivered = Arc::new(Mutex::new(0));
        let pipelines = Arc::new(Pipelines {
            traces: SignalPipeline::new("traces")
                .with_sink(TraceCounter(delivered.clone()), RetryPolicy::default()),
            metrics: SignalPipeline::new("metrics"),
            logs: SignalPipeline::new("logs"),
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(run_binary_listener(listener, pipelines));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = ExportRequest {
            payload: Some(export_request::Payload::Traces(TracesPayload::default())),
        };
        framing::write_frame(&mut stream, &request).await.unwrap();
        assert_eq!(framing::read_ack(&mut stream).await.unwrap(), Ack::Ok);

        for _ in 0..100 {
            if *delivered.lock().unwrap() == 1 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("payload not delivered");
    }
}
