use criterion::{criterion_group, criterion_main, Criterion};
use formsmap::config::{AnalysisConfig, FormsmapConfig};
use formsmap::{Engine, FormSource, FormTrigger};
use std::hint::black_box;

fn create_package_body(units: usize) -> String {
    let mut source = String::from("PACKAGE BODY bench_pkg IS\n");
    for i in 0..units {
        source.push_str(&format!(
            r#"
  PROCEDURE unit_{i}(p_id IN NUMBER, p_mode IN VARCHAR2 DEFAULT 'A') IS
    CURSOR c_lines IS SELECT id, qty FROM order_lines WHERE order_id = :ORDERS.ID;
    v_total NUMBER := 0;
  BEGIN
    IF :CONTROL.SELECTED = 'Y' THEN
      FOR r IN c_lines LOOP
        v_total := v_total + r.qty;
        UPDATE stock SET qty = qty - r.qty WHERE id = r.id;
      END LOOP;
    ELSIF p_mode = 'B' THEN
      INSERT INTO audit_log VALUES (p_id, SYSDATE);
    ELSE
      GO_BLOCK('ORDERS');
      EXECUTE_QUERY;
    END IF;
    :GLOBAL.LAST_TOTAL := v_total;
    unit_{next}(p_id);
    MESSAGE('Done');
  END unit_{i};
"#,
            next = (i + 1) % units
        ));
    }
    source.push_str("END bench_pkg;\n");
    source
}

fn engine(parallel: bool) -> Engine {
    Engine::with_config(FormsmapConfig {
        analysis: AnalysisConfig {
            parallel,
            ..AnalysisConfig::default()
        },
        ..FormsmapConfig::default()
    })
}

fn benchmark_extraction(c: &mut Criterion) {
    let source = create_package_body(200);

    c.bench_function("extract_units_sequential", |b| {
        let engine = engine(false);
        b.iter(|| engine.extract_units(black_box(&source)))
    });

    c.bench_function("extract_units_parallel", |b| {
        let engine = engine(true);
        b.iter(|| engine.extract_units(black_box(&source)))
    });
}

fn benchmark_full_analysis(c: &mut Criterion) {
    let form = FormSource {
        name: "BENCH".into(),
        program_units: create_package_body(100),
        triggers: vec![
            FormTrigger {
                name: "WHEN-NEW-FORM-INSTANCE".into(),
                code: "unit_0(1);".into(),
                block: None,
                item: None,
            },
            FormTrigger {
                name: "WHEN-BUTTON-PRESSED".into(),
                code: "unit_1(2);\nCOMMIT_FORM;".into(),
                block: Some("CONTROL".into()),
                item: Some("SAVE".into()),
            },
        ],
    };
    let engine = engine(true);

    c.bench_function("analyze_form", |b| b.iter(|| engine.analyze(black_box(&form))));
}

criterion_group!(benches, benchmark_extraction, benchmark_full_analysis);
criterion_main!(benches);
