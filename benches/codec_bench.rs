//! Criterion benchmark untuk codec XML-RPC dan SCGI framing
//!
//! Run dengan: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rtrelay::network::encode_request;
use rtrelay::xmlrpc::{build_call, parse_response, Multicall};
use rtrelay::{RpcValue, Target};

const COMMANDS: [&str; 6] = [
    "d.hash=",
    "d.name=",
    "d.size_bytes=",
    "d.completed_bytes=",
    "d.up.rate=",
    "d.down.rate=",
];

/// Response multicall palsu dengan `rows` torrent
fn multicall_response(rows: usize) -> String {
    let table = RpcValue::Array(
        (0..rows)
            .map(|i| {
                RpcValue::Array(vec![
                    RpcValue::from(format!("{i:040X}")),
                    RpcValue::from(format!("torrent-{i}.iso")),
                    RpcValue::from(4_294_967_296i64 + i as i64),
                    RpcValue::from(1_073_741_824i64),
                    RpcValue::from(512_000i64),
                    RpcValue::from(0i64),
                ])
            })
            .collect(),
    );
    format!(
        "<?xml version=\"1.0\"?><methodResponse><params><param>{}</param></params></methodResponse>",
        table.to_xml()
    )
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    group.throughput(Throughput::Elements(1));

    group.bench_function("multicall_call", |b| {
        let multicall = Multicall::new(Target::Download, "", "main").commands(COMMANDS);
        b.iter(|| black_box(multicall.to_call().to_xml()));
    });

    group.bench_function("scgi_frame", |b| {
        let body = build_call("system.listMethods", &[]);
        b.iter(|| black_box(encode_request(black_box(body.as_bytes()))));
    });

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for rows in [10, 100, 1000].iter() {
        let document = multicall_response(*rows);
        let multicall = Multicall::new(Target::Download, "", "main").commands(COMMANDS);

        group.throughput(Throughput::Bytes(document.len() as u64));
        group.bench_function(format!("multicall_{}", rows), |b| {
            b.iter(|| {
                let response = parse_response(black_box(&document)).unwrap();
                if let rtrelay::MethodResponse::Success(value) = response {
                    black_box(multicall.remap(value).unwrap());
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
