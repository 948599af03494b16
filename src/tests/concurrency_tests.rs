//! Concurrent read tests: every element is delivered to exactly one worker,
//! with no duplicates and no losses, in each sharing mode.

use std::collections::HashSet;
use std::sync::Mutex;
use std::thread;

use crate::source::{InMemoryStreamSource, SetupContext};
use crate::{JsonDecoderFactory, ReaderBuilder, RecordReader, TextDecoderFactory};

const WORKERS: usize = 4;

fn drain_concurrently<R, Out>(reader: &RecordReader<R, Out>) -> Vec<Out>
where
    R: std::fmt::Debug + Send + 'static,
    Out: Send,
{
    let collected = Mutex::new(Vec::new());
    thread::scope(|scope| {
        for _ in 0..WORKERS {
            scope.spawn(|| {
                while let Some(record) = reader.read().expect("read record") {
                    collected.lock().unwrap().push(record);
                }
            });
        }
    });
    collected.into_inner().unwrap()
}

#[test]
fn splitting_a_shared_stream_delivers_each_element_once() {
    let total = 100;
    let mut data = String::new();
    for i in 0..total {
        data.push_str(&format!("REC {i}\npayload line\n"));
    }

    let reader = ReaderBuilder::<String>::new()
        .source(InMemoryStreamSource::from_string("records", data))
        .decoder(TextDecoderFactory::new())
        .start_pattern("REC [0-9]+")
        .build()
        .expect("build reader");
    reader.setup(&SetupContext::new()).unwrap();

    let elements = drain_concurrently(&reader);
    reader.cleanup().unwrap();

    assert_eq!(elements.len(), total);
    let headers: HashSet<&str> = elements
        .iter()
        .map(|e| e.lines().next().expect("header line"))
        .collect();
    assert_eq!(headers.len(), total);
    for element in &elements {
        assert!(element.ends_with("payload line\n"));
    }
}

#[test]
fn shared_decoder_delivers_each_record_once() {
    let total = 100;
    let mut data = String::new();
    for i in 0..total {
        data.push_str(&format!("{{\"id\":{i}}}\n"));
    }

    let reader = ReaderBuilder::<serde_json::Value>::new()
        .source(InMemoryStreamSource::from_string("records", data))
        .decoder(JsonDecoderFactory::new())
        .build()
        .expect("build reader");
    reader.setup(&SetupContext::new()).unwrap();

    let records = drain_concurrently(&reader);
    reader.cleanup().unwrap();

    assert_eq!(records.len(), total);
    let ids: HashSet<i64> = records
        .iter()
        .map(|v| v["id"].as_i64().expect("id field"))
        .collect();
    assert_eq!(ids.len(), total);
}

#[test]
fn per_thread_streams_drain_every_document() {
    let docs: Vec<String> = (0..8)
        .map(|doc| {
            (0..5)
                .map(|i| format!("{{\"id\":{}}}\n", doc * 5 + i))
                .collect()
        })
        .collect();

    let reader = ReaderBuilder::<serde_json::Value>::new()
        .source(InMemoryStreamSource::from_strings("records", docs).with_sharing(false))
        .decoder(JsonDecoderFactory::new())
        .build()
        .expect("build reader");
    reader.setup(&SetupContext::new()).unwrap();

    let records = drain_concurrently(&reader);
    reader.cleanup().unwrap();

    assert_eq!(records.len(), 40);
    let ids: HashSet<i64> = records
        .iter()
        .map(|v| v["id"].as_i64().expect("id field"))
        .collect();
    assert_eq!(ids.len(), 40);
}
