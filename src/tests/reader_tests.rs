//! End-to-end tests for the record reader: sharing modes, validation,
//! listeners, lifecycle, and configuration errors.

use serde::Deserialize;

use crate::error::{ConfigError, ReadError, ValidationError};
use crate::listener::{Context, ParseListener};
use crate::source::{InMemoryStreamSource, SetupContext};
use crate::{JsonDecoderFactory, ReaderBuilder, RecordReader};

#[derive(Debug, Deserialize, PartialEq)]
struct Employee {
    name: String,
    age: i64,
}

fn employee_json(name: &str, age: i64) -> String {
    format!("{{\"name\":\"{name}\",\"age\":{age}}}")
}

fn drain(reader: &RecordReader<Employee>) -> Vec<Employee> {
    let mut records = Vec::new();
    while let Some(record) = reader.read().expect("read record") {
        records.push(record);
    }
    records
}

#[test]
fn reads_records_through_a_shared_decoder() {
    // No start pattern, sharing source: one decoder drains the stream.
    let data = format!("{}\n{}\n", employee_json("ann", 34), employee_json("bob", 51));
    let reader = ReaderBuilder::<Employee>::new()
        .source(InMemoryStreamSource::from_string("people", data))
        .decoder(JsonDecoderFactory::new())
        .build()
        .expect("build reader");

    reader.setup(&SetupContext::new()).unwrap();
    let records = drain(&reader);
    reader.cleanup().unwrap();

    assert_eq!(
        records,
        vec![
            Employee {
                name: "ann".into(),
                age: 34
            },
            Employee {
                name: "bob".into(),
                age: 51
            },
        ]
    );
}

#[test]
fn reads_records_with_per_thread_streams() {
    // A source that advises against sharing binds one stream per thread and
    // replaces it when it runs dry; a single thread drains them in order.
    let docs = vec![
        format!("{}\n", employee_json("ann", 34)),
        format!("{}\n{}\n", employee_json("bob", 51), employee_json("cid", 19)),
    ];
    let reader = ReaderBuilder::<Employee>::new()
        .source(InMemoryStreamSource::from_strings("people", docs).with_sharing(false))
        .decoder(JsonDecoderFactory::new())
        .build()
        .expect("build reader");

    reader.setup(&SetupContext::new()).unwrap();
    let records = drain(&reader);
    reader.cleanup().unwrap();

    let names: Vec<_> = records.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["ann", "bob", "cid"]);
}

#[test]
fn non_sharing_source_keeps_per_thread_streams_despite_a_start_pattern() {
    // The source's advice wins: without a shareable stream there is nothing
    // to split, so the pattern is ignored and each stream is decoded
    // directly, element boundaries and all.
    let docs = vec![
        format!("{}\n{}\n", employee_json("ann", 34), employee_json("bob", 51)),
        format!("{}\n", employee_json("cid", 19)),
    ];
    let reader = ReaderBuilder::<Employee>::new()
        .source(InMemoryStreamSource::from_strings("people", docs).with_sharing(false))
        .decoder(JsonDecoderFactory::new())
        .start_pattern("\\{.*")
        .build()
        .expect("build reader");

    reader.setup(&SetupContext::new()).unwrap();
    let records = drain(&reader);
    reader.cleanup().unwrap();

    let names: Vec<_> = records.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["ann", "bob", "cid"]);
}

#[test]
fn reads_records_by_splitting_a_shared_stream() {
    // Start pattern plus sharing source: elements are extracted under the
    // splitter's lock and decoded individually.
    let data = format!("{}\n{}\n", employee_json("ann", 34), employee_json("bob", 51));
    let reader = ReaderBuilder::<Employee>::new()
        .source(InMemoryStreamSource::from_string("people", data))
        .decoder(JsonDecoderFactory::new())
        .start_pattern("\\{.*")
        .build()
        .expect("build reader");

    reader.setup(&SetupContext::new()).unwrap();
    let records = drain(&reader);
    reader.cleanup().unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].name, "ann");
    assert_eq!(records[1].name, "bob");
}

#[test]
fn splits_multi_line_elements_with_a_stop_pattern() {
    let data = "{\n\"name\": \"ann\",\n\"age\": 34\n}\n{\n\"name\": \"bob\",\n\"age\": 51\n}\n";
    let reader = ReaderBuilder::<Employee>::new()
        .source(InMemoryStreamSource::from_string("people", data))
        .decoder(JsonDecoderFactory::new())
        .start_pattern("\\{")
        .stop_pattern("\\}")
        .build()
        .expect("build reader");

    reader.setup(&SetupContext::new()).unwrap();
    let records = drain(&reader);
    reader.cleanup().unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[1].name, "bob");
}

#[test]
fn empty_source_reads_nothing() {
    let reader = ReaderBuilder::<Employee>::new()
        .source(InMemoryStreamSource::from_strings("empty", Vec::new()))
        .decoder(JsonDecoderFactory::new())
        .build()
        .expect("build reader");

    reader.setup(&SetupContext::new()).unwrap();
    assert!(reader.read().unwrap().is_none());
    reader.cleanup().unwrap();
}

#[test]
fn validation_rejects_bad_records_and_carries_them() {
    let data = format!("{}\n{}\n", employee_json("ann", 34), employee_json("kid", 7));
    let reader = ReaderBuilder::<Employee>::new()
        .source(InMemoryStreamSource::from_string("people", data))
        .decoder(JsonDecoderFactory::new())
        .start_pattern("\\{.*")
        .validate_with(|| {
            |record: &Employee| {
                if record.age >= 18 {
                    Ok(())
                } else {
                    Err(ValidationError::new("age must be at least 18"))
                }
            }
        })
        .build()
        .expect("build reader");
    assert!(reader.is_validating());

    reader.setup(&SetupContext::new()).unwrap();
    assert_eq!(reader.read().unwrap().unwrap().name, "ann");

    match reader.read().unwrap_err() {
        ReadError::Validation {
            source_id,
            record,
            source,
        } => {
            assert_eq!(source_id, "people");
            assert_eq!(record.name, "kid");
            assert_eq!(source.violations, vec!["age must be at least 18"]);
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    reader.cleanup().unwrap();
}

#[test]
fn the_same_input_passes_without_validation() {
    let data = format!("{}\n", employee_json("kid", 7));
    let reader = ReaderBuilder::<Employee>::new()
        .source(InMemoryStreamSource::from_string("people", data))
        .decoder(JsonDecoderFactory::new())
        .start_pattern("\\{.*")
        .build()
        .expect("build reader");
    assert!(!reader.is_validating());

    reader.setup(&SetupContext::new()).unwrap();
    assert_eq!(reader.read().unwrap().unwrap().name, "kid");
    reader.cleanup().unwrap();
}

#[test]
fn malformed_element_fails_with_the_offending_text() {
    let data = format!("{}\n{{\"name\":oops}}\n", employee_json("ann", 34));
    let reader = ReaderBuilder::<Employee>::new()
        .source(InMemoryStreamSource::from_string("people", data))
        .decoder(JsonDecoderFactory::new())
        .start_pattern("\\{.*")
        .build()
        .expect("build reader");

    reader.setup(&SetupContext::new()).unwrap();
    assert!(reader.read().unwrap().is_some());

    match reader.read().unwrap_err() {
        ReadError::Parse {
            source_id, text, ..
        } => {
            assert_eq!(source_id, "people");
            assert!(text.contains("oops"));
        }
        other => panic!("expected parse error, got {other:?}"),
    }
    reader.cleanup().unwrap();
}

#[test]
fn oversized_element_fails_the_read() {
    let data = format!("{}\n", employee_json("someone with a very long name", 34));
    let reader = ReaderBuilder::<Employee>::new()
        .source(InMemoryStreamSource::from_string("people", data))
        .decoder(JsonDecoderFactory::new())
        .start_pattern("\\{.*")
        .max_element_size(16)
        .build()
        .expect("build reader");

    reader.setup(&SetupContext::new()).unwrap();
    match reader.read().unwrap_err() {
        ReadError::ElementOverflow { source_id, limit } => {
            assert_eq!(source_id, "people");
            assert_eq!(limit, 16);
        }
        other => panic!("expected overflow error, got {other:?}"),
    }
    reader.cleanup().unwrap();
}

/// Listener that redacts a token from raw lines, remembers each element's
/// size, and folds both into the returned value.
struct Auditing;

impl ParseListener<Employee, (Employee, usize)> for Auditing {
    fn process_line(&self, line: String) -> String {
        line.replace("CLASSIFIED", "ann")
    }

    fn derive_context(&self, element: &str) -> Option<Context> {
        Some(Box::new(element.len()))
    }

    fn finalize(&self, record: Employee, context: Option<Context>) -> (Employee, usize) {
        let size = context
            .and_then(|c| c.downcast::<usize>().ok())
            .map(|s| *s)
            .unwrap_or(0);
        (record, size)
    }
}

#[test]
fn listener_rewrites_lines_and_pairs_context_with_records() {
    let element = employee_json("CLASSIFIED", 34);
    let redacted_len = element.replace("CLASSIFIED", "ann").len() + 1;
    let reader = ReaderBuilder::<Employee>::new()
        .source(InMemoryStreamSource::from_string("people", format!("{element}\n")))
        .decoder(JsonDecoderFactory::new())
        .start_pattern("\\{.*")
        .listener(Auditing)
        .build()
        .expect("build reader");

    reader.setup(&SetupContext::new()).unwrap();
    let (record, size) = reader.read().unwrap().expect("one record");
    reader.cleanup().unwrap();

    assert_eq!(record.name, "ann");
    assert_eq!(size, redacted_len);
}

#[test]
fn missing_source_is_a_configuration_error() {
    let err = ReaderBuilder::<Employee>::new()
        .decoder(JsonDecoderFactory::new())
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigError::MissingSource));
}

#[test]
fn missing_decoder_is_a_configuration_error() {
    let err = ReaderBuilder::<Employee>::new()
        .source(InMemoryStreamSource::from_string("people", ""))
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigError::MissingDecoder));
}

#[test]
fn stop_pattern_without_start_is_rejected() {
    let err = ReaderBuilder::<Employee>::new()
        .source(InMemoryStreamSource::from_string("people", ""))
        .decoder(JsonDecoderFactory::new())
        .stop_pattern("\\}")
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigError::StopWithoutStart));
}

#[test]
fn invalid_pattern_is_rejected_at_build_time() {
    let err = ReaderBuilder::<Employee>::new()
        .source(InMemoryStreamSource::from_string("people", ""))
        .decoder(JsonDecoderFactory::new())
        .start_pattern("([unclosed")
        .build()
        .unwrap_err();
    match err {
        ConfigError::InvalidPattern { which, .. } => assert_eq!(which, "start"),
        other => panic!("expected invalid pattern error, got {other:?}"),
    }
}

#[test]
fn cleanup_is_safe_after_a_failed_read() {
    let reader = ReaderBuilder::<Employee>::new()
        .source(InMemoryStreamSource::from_string("people", "not json\n"))
        .decoder(JsonDecoderFactory::new())
        .build()
        .expect("build reader");

    reader.setup(&SetupContext::new()).unwrap();
    assert!(reader.read().is_err());
    reader.cleanup().unwrap();
}

#[cfg(feature = "csv")]
mod csv {
    use serde::Deserialize;

    use crate::source::{InMemoryStreamSource, SetupContext};
    use crate::{CsvDecoderFactory, ReaderBuilder};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Row {
        name: String,
        age: i64,
    }

    #[test]
    fn reads_headerless_csv_rows() {
        let reader = ReaderBuilder::<Row>::new()
            .source(InMemoryStreamSource::from_string("rows", "ann,34\nbob,51\n"))
            .decoder(CsvDecoderFactory::new())
            .build()
            .expect("build reader");

        reader.setup(&SetupContext::new()).unwrap();
        let first = reader.read().unwrap().expect("first row");
        let second = reader.read().unwrap().expect("second row");
        assert!(reader.read().unwrap().is_none());
        reader.cleanup().unwrap();

        assert_eq!(first.name, "ann");
        assert_eq!(second.age, 51);
    }

    #[test]
    fn undecodable_csv_row_is_a_parse_error() {
        let reader = ReaderBuilder::<Row>::new()
            .source(InMemoryStreamSource::from_string("rows", "ann,not-a-number\n"))
            .decoder(CsvDecoderFactory::new())
            .build()
            .expect("build reader");

        reader.setup(&SetupContext::new()).unwrap();
        match reader.read().unwrap_err() {
            crate::error::ReadError::Parse { source_id, .. } => {
                assert_eq!(source_id, "rows");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
        reader.cleanup().unwrap();
    }
}
