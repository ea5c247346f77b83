//! Criterion benchmarks for agent-chat.
//!
//! Covers the per-turn hot path: normalization, bag-of-words encoding and
//! classifier prediction.

use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};

use agent_chat::analysis::analyzer::Analyzer;
use agent_chat::analysis::analyzer::simple::SimpleAnalyzer;
use agent_chat::analysis::normalizer::{self, normalize};
use agent_chat::intent::{Intent, IntentCatalog};
use agent_chat::ml::dataset::build_dataset;
use agent_chat::ml::encoder::BagOfWordsEncoder;

const SENTENCES: [&str; 6] = [
    "Hello there, how are you doing today?",
    "I'd like to know the opening hours of the stores",
    "Which payment methods do you accept?",
    "Goodbye and thanks for all the help!",
    "Can you recommend some books about children?",
    "What's the weather going to be like tomorrow",
];

fn sample_catalog() -> IntentCatalog {
    let topics = [
        ("greet", ["hello", "hi there", "good morning", "hey how are you"]),
        ("bye", ["bye", "see you later", "goodbye", "talk to you soon"]),
        ("hours", ["when are you open", "opening hours", "what time do you close", "are you open today"]),
        ("payments", ["do you take credit cards", "can I pay with cash", "payment methods", "accept mastercard"]),
        ("books", ["recommend a book", "books for children", "good novels", "what should I read"]),
    ];

    IntentCatalog::new(
        topics
            .iter()
            .map(|(tag, patterns)| {
                Intent::new(
                    *tag,
                    patterns.iter().map(|p| p.to_string()).collect(),
                    vec![format!("About {tag}")],
                )
            })
            .collect(),
    )
}

fn bench_normalization(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalization");
    group.throughput(Throughput::Elements(SENTENCES.len() as u64));

    let analyzers: Vec<Arc<dyn Analyzer>> = vec![
        normalizer::shared_or_degraded(),
        Arc::new(SimpleAnalyzer::new()),
    ];
    for analyzer in analyzers {
        group.bench_function(analyzer.name(), |b| {
            b.iter(|| {
                for sentence in SENTENCES {
                    black_box(normalize(analyzer.as_ref(), black_box(sentence)).unwrap());
                }
            })
        });
    }

    group.finish();
}

fn bench_encoding(c: &mut Criterion) {
    let analyzer = normalizer::shared_or_degraded();
    let dataset = build_dataset(&sample_catalog(), analyzer.as_ref()).unwrap();
    let encoder = BagOfWordsEncoder::new(dataset.vocabulary, analyzer);

    let mut group = c.benchmark_group("encoding");
    group.throughput(Throughput::Elements(SENTENCES.len() as u64));
    group.bench_function("bag_of_words", |b| {
        b.iter(|| {
            for sentence in SENTENCES {
                black_box(encoder.encode(black_box(sentence)).unwrap());
            }
        })
    });
    group.finish();
}

#[cfg(feature = "mlp")]
fn bench_prediction(c: &mut Criterion) {
    use agent_chat::ml::TrainingConfig;
    use agent_chat::ml::artifact::TrainedBundle;
    use agent_chat::ml::trainer::Trainer;

    let temp_dir = tempfile::TempDir::new().unwrap();
    let analyzer = normalizer::shared_or_degraded();
    let config = TrainingConfig {
        seed: Some(42),
        ..Default::default()
    };
    let artifacts = Trainer::new(config, Arc::clone(&analyzer))
        .train(&sample_catalog(), temp_dir.path(), 20, 5)
        .unwrap();
    let bundle = TrainedBundle::load(&artifacts.model_path, analyzer).unwrap();

    let mut group = c.benchmark_group("prediction");
    group.throughput(Throughput::Elements(SENTENCES.len() as u64));
    group.bench_function("mlp_128_64", |b| {
        b.iter(|| {
            for sentence in SENTENCES {
                black_box(bundle.predict(black_box(sentence)).unwrap());
            }
        })
    });
    group.finish();
}

#[cfg(not(feature = "mlp"))]
fn bench_prediction(_c: &mut Criterion) {}

criterion_group!(benches, bench_normalization, bench_encoding, bench_prediction);
criterion_main!(benches);
