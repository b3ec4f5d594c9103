// Compilation pipeline benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tova::lexer::Lexer;
use tova::parser::Parser;

const SAMPLE: &str = r#"
shared {
    type Shape { Circle(r: Float), Square(s: Float) }

    fn area(x) {
        match x {
            Circle(r) => 3.14 * r * r,
            Square(s) => s * s,
            _ => 0
        }
    }
}

server {
    fn add(a, b) { a + b }
    fn shapes(req) { map(range(10), i => Circle(i)) }
    route POST "/add" => add
    route GET "/shapes" => shapes
}

client {
    state shapes = []
    state selected = 0
    computed total_area = sum(map(shapes, area))

    effect { print(total_area) }

    fn refresh() { server.shapes() }

    component ShapeList() {
        <ul>
            for s, i in shapes key={i} {
                <li class:selected={i == selected} on:click={select}>{area(s)}</li>
            }
        </ul>
    }

    fn select(i) { selected = i }

    component App() {
        <div>
            <h1>shapes: {len(shapes)}</h1>
            if len(shapes) == 0 { <p>empty</p> } else { <ShapeList/> }
        </div>
    }
}
"#;

fn bench_lexer(c: &mut Criterion) {
    c.bench_function("lex_sample", |b| {
        b.iter(|| {
            let mut lexer = Lexer::new(black_box(SAMPLE), "bench.tova");
            lexer.tokenize().unwrap()
        })
    });
}

fn bench_parser(c: &mut Criterion) {
    c.bench_function("parse_sample", |b| {
        b.iter(|| Parser::parse_source(black_box(SAMPLE), "bench.tova").unwrap())
    });
}

fn bench_full_pipeline(c: &mut Criterion) {
    c.bench_function("compile_sample", |b| {
        b.iter(|| tova::compile_source(black_box(SAMPLE), "bench.tova", "bench").unwrap())
    });
}

fn bench_analyzer(c: &mut Criterion) {
    let program = Parser::parse_source(SAMPLE, "bench.tova").unwrap();
    c.bench_function("analyze_sample", |b| {
        b.iter(|| tova::analyzer::analyze(black_box(&program), false))
    });
}

criterion_group!(
    benches,
    bench_lexer,
    bench_parser,
    bench_analyzer,
    bench_full_pipeline
);
criterion_main!(benches);
