// Garbage collection behavior observed through the interpreter

use scm754::config::Config;
use scm754::interpreter::engine::Interpreter;
use scm754::interpreter::errors::SchemeError;

fn small(cells: usize) -> Interpreter {
    Interpreter::new(Config::with_cells(cells)).expect("interpreter creation failed")
}

#[test]
fn test_allocating_past_capacity_reuses_cells() {
    let mut interp = small(2048);
    let source = r#"
        (define (churn n)
          (if (= n 0)
              'done
              (let ((garbage (list n n n n n n n n)))
                (churn (- n 1)))))
        (churn 20000)
    "#;
    assert_eq!(interp.eval_str(source).unwrap(), "done");

    let stats = *interp.heap().gc_stats();
    assert!(stats.collections > 0);
    assert!(stats.cells_freed > 2048);
    assert!(interp.heap().cells_in_use() <= 2048);
}

#[test]
fn test_explicit_collection_frees_unreachable_data() {
    let mut interp = small(4096);
    interp.eval_str("(list 1 2 3)").unwrap();
    interp.eval_str("(number->string 12345)").unwrap();

    let report = interp.collect_garbage();
    assert!(report.cells_freed >= 3);
    assert!(report.strings_freed >= 1);
    assert_eq!(report.cells_live, interp.heap().cells_in_use());
}

#[test]
fn test_reachable_data_survives_collection() {
    let mut interp = small(4096);
    interp
        .run_source(r#"(define keep (list 1 "two" 'three (lambda (x) x)))"#)
        .unwrap();
    interp.collect_garbage();
    interp.collect_garbage();
    assert_eq!(
        interp.eval_str("(list (car keep) (car (cdr keep)) (car (cdr (cdr keep))))").unwrap(),
        "(1 \"two\" three)"
    );
    assert_eq!(interp.eval_str("((car (cdr (cdr (cdr keep)))) 9)").unwrap(), "9");
}

#[test]
fn test_symbols_keep_identity_across_collections() {
    let mut interp = small(1024);
    interp.eval_str("(define s 'marker)").unwrap();
    interp.eval_str("(string->symbol \"fresh-name\")").unwrap();
    interp.collect_garbage();
    assert_eq!(interp.eval_str("(eq? s 'marker)").unwrap(), "#t");
    assert_eq!(
        interp.eval_str("(eq? (string->symbol \"fresh-name\") 'fresh-name)").unwrap(),
        "#t"
    );
}

#[test]
fn test_cycles_terminate_marking() {
    let mut interp = small(1024);
    interp
        .run_source("(define p (list 1 2)) (set-cdr! (cdr p) p)")
        .unwrap();
    interp
        .run_source("(let ((q (list 3 4))) (set-cdr! (cdr q) q) 'made)")
        .unwrap();

    let report = interp.collect_garbage();
    assert!(report.cells_freed >= 2);
    assert_eq!(interp.eval_str("(car (cdr (cdr (cdr p))))").unwrap(), "2");
}

#[test]
fn test_live_data_larger_than_pool_runs_out_of_memory() {
    let mut interp = small(256);
    let source = r#"
        (define (build n) (if (= n 0) '() (cons n (build (- n 1)))))
        (build 1000)
    "#;
    assert!(matches!(
        interp.eval_str(source),
        Err(SchemeError::OutOfMemory { pool: "cell", .. })
    ));
    assert_eq!(interp.heap().root_depth(), 0);
}

#[test]
fn test_collection_disabled_by_zero_interval_still_collects_when_low() {
    let config = Config {
        gc_interval: 0,
        ..Config::with_cells(1024)
    };
    let mut interp = Interpreter::new(config).expect("interpreter");
    let source = r#"
        (define (spin n) (if (= n 0) n (spin (- n 1))))
        (spin 5000)
    "#;
    assert_eq!(interp.eval_str(source).unwrap(), "0");
    assert!(interp.heap().gc_stats().collections > 0);
}
