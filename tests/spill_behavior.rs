use std::io::{Cursor, Seek, SeekFrom, Write};
use std::sync::Arc;

use randrec::{
    ByteSource, FileSource, LiteralPattern, ReaderSource, SampleSize, ShuffleConfig,
    ShuffleDriver, WriterSink,
};

fn lines_input(count: usize) -> Vec<u8> {
    (0..count)
        .flat_map(|i| format!("payload line {i}\n").into_bytes())
        .collect()
}

fn sorted_lines(output: &[u8]) -> Vec<Vec<u8>> {
    let mut lines: Vec<Vec<u8>> = output
        .split(|&b| b == b'\n')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_vec())
        .collect();
    lines.sort();
    lines
}

#[test]
fn zero_budget_spills_every_record_and_stays_at_zero() {
    let input = lines_input(100);
    let config = ShuffleConfig {
        memory_budget: 0,
        seed: Some(8),
        ..ShuffleConfig::default()
    };
    let mut driver =
        ShuffleDriver::new(config, Arc::new(LiteralPattern::new(b"\n"))).expect("driver");
    let budget = driver.budget();
    driver
        .add_source(Box::new(ReaderSource::new(Cursor::new(input.clone()))))
        .expect("source");
    let mut sink = WriterSink::new(Vec::new(), b"\n");
    let stats = driver.run(&mut sink).expect("run");
    assert_eq!(stats.spilled_bytes, input.len() as u64);
    assert_eq!(budget.available(), 0);
    assert_eq!(sorted_lines(&sink.into_inner()), sorted_lines(&input));
}

#[test]
fn budget_is_restored_after_a_mixed_run() {
    let input = lines_input(300);
    let config = ShuffleConfig {
        // Small enough that later records must spill.
        memory_budget: 2048,
        seed: Some(21),
        ..ShuffleConfig::default()
    };
    let mut driver =
        ShuffleDriver::new(config, Arc::new(LiteralPattern::new(b"\n"))).expect("driver");
    let budget = driver.budget();
    driver
        .add_source(Box::new(ReaderSource::new(Cursor::new(input.clone()))))
        .expect("source");
    let mut sink = WriterSink::new(Vec::new(), b"\n");
    let stats = driver.run(&mut sink).expect("run");
    assert!(stats.spilled_bytes > 0, "run must have spilled");
    assert_eq!(stats.records_resident, 0);
    assert_eq!(stats.records_spilled, 0);
    assert_eq!(budget.available(), budget.cap());
    assert_eq!(sorted_lines(&sink.into_inner()), sorted_lines(&input));
}

#[test]
fn eviction_under_bounded_sampling_restores_the_budget() {
    let input = lines_input(500);
    let config = ShuffleConfig {
        memory_budget: 1024,
        sample: SampleSize::AtMost(10),
        seed: Some(4),
        ..ShuffleConfig::default()
    };
    let mut driver =
        ShuffleDriver::new(config, Arc::new(LiteralPattern::new(b"\n"))).expect("driver");
    let budget = driver.budget();
    driver
        .add_source(Box::new(ReaderSource::new(Cursor::new(input))))
        .expect("source");
    let mut sink = WriterSink::new(Vec::new(), b"\n");
    let stats = driver.run(&mut sink).expect("run");
    assert_eq!(stats.records_seen, 500);
    assert_eq!(stats.records_written, 10);
    assert_eq!(budget.available(), budget.cap());
}

#[test]
fn seekable_and_piped_delivery_produce_identical_output() {
    let input = b"alpha\nbeta\ngamma\ndelta\nepsilon\n".to_vec();

    let run = |seekable: bool| -> Vec<u8> {
        let config = ShuffleConfig {
            seed: Some(1701),
            ..ShuffleConfig::default()
        };
        let mut driver =
            ShuffleDriver::new(config, Arc::new(LiteralPattern::new(b"\n"))).expect("driver");
        if seekable {
            let mut file = tempfile::tempfile().expect("tempfile");
            file.write_all(&input).expect("write");
            file.seek(SeekFrom::Start(0)).expect("rewind");
            let source = FileSource::from_file(file).expect("file source");
            assert!(source.is_seekable());
            driver.add_source(Box::new(source)).expect("source");
        } else {
            driver
                .add_source(Box::new(ReaderSource::new(Cursor::new(input.clone()))))
                .expect("source");
        }
        let mut sink = WriterSink::new(Vec::new(), b"\n");
        driver.run(&mut sink).expect("run");
        sink.into_inner()
    };

    assert_eq!(run(true), run(false));
}

#[test]
fn multiple_sources_mix_seekable_and_piped_records() {
    let file_input = b"f1\nf2\nf3\n".to_vec();
    let pipe_input = b"p1\np2\np3\n".to_vec();
    let config = ShuffleConfig {
        seed: Some(33),
        ..ShuffleConfig::default()
    };
    let mut driver =
        ShuffleDriver::new(config, Arc::new(LiteralPattern::new(b"\n"))).expect("driver");
    let mut file = tempfile::tempfile().expect("tempfile");
    file.write_all(&file_input).expect("write");
    file.seek(SeekFrom::Start(0)).expect("rewind");
    driver
        .add_source(Box::new(FileSource::from_file(file).expect("file source")))
        .expect("source");
    driver
        .add_source(Box::new(ReaderSource::new(Cursor::new(pipe_input))))
        .expect("source");
    let mut sink = WriterSink::new(Vec::new(), b"\n");
    let stats = driver.run(&mut sink).expect("run");
    assert_eq!(stats.records_seen, 6);
    assert_eq!(stats.records_written, 6);
    let expected = sorted_lines(b"f1\nf2\nf3\np1\np2\np3\n");
    assert_eq!(sorted_lines(&sink.into_inner()), expected);
}
