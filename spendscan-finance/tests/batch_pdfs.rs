use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use rust_decimal_macros::dec;
use spendscan_core::{EngineConfig, ErrorKind, ExpenseRecord, ParseStatus};
use spendscan_finance::{
    export_csv, parse_batch, parse_multiple_pdfs, parse_pdf, read_csv, BatchOptions, CancelToken, InputFile,
};
use spendscan_ingest::StatementEngine;
use std::sync::Arc;
use std::time::Duration;

const CHASE_APRIL: &str = "JPMorgan Chase Bank, N.A.
Chase Total Checking
March 30, 2024 through April 29, 2024
Account Number: 000000123456789
CHECKING SUMMARY
TRANSACTION DETAIL
       DATE        DESCRIPTION                                     AMOUNT     BALANCE
                   Beginning Balance                                           $68.70
       04/22       Discover     E-Payment 8148   Web ID: 123       -15.00      53.70
       04/23       PAYROLL ACME INC                                100.00     153.70
                   PPD ID: 9999
       04/24       Card Purchase 04/23 H-E-B #455 San Marcos TX    -12.34     141.36
                   Ending Balance                                             $141.36";

const CHASE_MAY: &str = "JPMorgan Chase Bank, N.A.
Chase Total Checking
April 30, 2024 through May 29, 2024
Account Number: 000000123456789
CHECKING SUMMARY
TRANSACTION DETAIL
       DATE        DESCRIPTION                                     AMOUNT     BALANCE
       05/02       RENT MAY                                       -900.00     241.36
       05/15       PAYROLL ACME INC                               1000.00    1241.36
                   Ending Balance                                            $1241.36";

/// One text object per line so extracted text keeps the line breaks.
fn pdf_from_pages(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let mut operations = Vec::new();
        for (i, line) in text.lines().filter(|l| !l.trim().is_empty()).enumerate() {
            let y = 800 - 12 * i as i64;
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 8.into()]));
            operations.push(Operation::new("Td", vec![20.into(), y.into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(line)]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

fn engine() -> Arc<StatementEngine> {
    Arc::new(StatementEngine::with_defaults().unwrap())
}

#[test]
fn test_single_pdf_parses_chase_rows() {
    let bytes = pdf_from_pages(&[CHASE_APRIL]);
    let result = parse_pdf(&engine(), "chase_april.pdf", &bytes);
    assert_eq!(result.detected_format(), "chase_checking");
    assert_eq!(result.status(), ParseStatus::Success);
    let amounts: Vec<_> = result.records().iter().map(|r| r.amount).collect();
    assert_eq!(amounts, vec![dec!(-15.00), dec!(100.00), dec!(-12.34)]);
    assert!(result.records().iter().all(|r| r.source_file == "chase_april.pdf"));
}

#[test]
fn test_parsing_same_bytes_twice_is_identical() {
    let bytes = pdf_from_pages(&[CHASE_APRIL, CHASE_MAY]);
    let e = engine();
    let first = parse_pdf(&e, "chase.pdf", &bytes);
    let second = parse_pdf(&e, "chase.pdf", &bytes);
    assert_eq!(first, second);
    assert_eq!(first.records().len(), 5);
}

#[tokio::test]
async fn test_plain_text_file_in_the_middle_fails_alone() {
    let files = vec![
        InputFile::new("april.pdf", pdf_from_pages(&[CHASE_APRIL])),
        InputFile::new("notes.txt", b"remember to pay rent".to_vec()),
        InputFile::new("may.pdf", pdf_from_pages(&[CHASE_MAY])),
    ];
    let report = parse_multiple_pdfs(engine(), files, &CancelToken::new()).await.unwrap();

    let statuses: Vec<_> = report.results.iter().map(|r| r.status()).collect();
    assert_eq!(statuses, vec![ParseStatus::Success, ParseStatus::Failed, ParseStatus::Success]);
    assert_eq!(report.results[1].first_error_kind(), Some(ErrorKind::UnreadablePdf));
    assert_eq!(report.results[1].source_file(), "notes.txt");

    let s = &report.summary;
    assert_eq!(s.total_files, 3);
    assert_eq!(s.succeeded, 2);
    assert_eq!(s.failed, 1);
    assert_eq!(s.total_records, 5);
    assert_eq!(s.total_debit + s.total_credit, s.net);
}

#[tokio::test]
async fn test_corrupt_pdf_is_isolated() {
    let good = pdf_from_pages(&[CHASE_APRIL]);
    let corrupt = b"%PDF-1.5\n1 0 obj << /Type /Catalog >> garbage".to_vec();

    let files: Vec<_> = (0..5)
        .map(|i| {
            if i == 3 {
                InputFile::new(format!("statement_{i}.pdf"), corrupt.clone())
            } else {
                InputFile::new(format!("statement_{i}.pdf"), good.clone())
            }
        })
        .collect();
    let report = parse_multiple_pdfs(engine(), files, &CancelToken::new()).await.unwrap();

    assert_eq!(report.summary.total_files, 5);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.succeeded, 4);
    assert_eq!(report.results[3].status(), ParseStatus::Failed);
    let names: Vec<_> = report.results.iter().map(|r| r.source_file()).collect();
    assert_eq!(names, vec!["statement_0.pdf", "statement_1.pdf", "statement_2.pdf", "statement_3.pdf", "statement_4.pdf"]);
}

#[tokio::test]
async fn test_slow_files_time_out_one_at_a_time() {
    // several hundred pages take far longer than one timer tick to extract
    let long = pdf_from_pages(&vec![CHASE_APRIL; 600]);
    let files = vec![
        InputFile::new("long_1.pdf", long.clone()),
        InputFile::new("long_2.pdf", long),
    ];
    let options = BatchOptions {
        workers: 1,
        per_file_timeout: Duration::ZERO,
        batch_timeout: None,
    };
    let report = parse_batch(engine(), files, &options, &CancelToken::new()).await.unwrap();

    assert!(report.results.iter().all(|r| r.first_error_kind() == Some(ErrorKind::Timeout)));
    assert!(report.results.iter().all(|r| r.records().is_empty()));
    assert_eq!(report.summary.failed, 2);
    assert_eq!(report.summary.total_records, 0);
}

#[test]
fn test_parsed_records_survive_csv_export() {
    let config = EngineConfig::default();
    let result = parse_pdf(&engine(), "chase_april.pdf", &pdf_from_pages(&[CHASE_APRIL]));
    let records: Vec<ExpenseRecord> = result
        .into_records()
        .into_iter()
        .map(|r| ExpenseRecord { raw_line: None, ..r })
        .collect();

    let payload = serde_json::to_value(&records).unwrap();
    let export = export_csv(&payload, &config).unwrap();
    assert_eq!(read_csv(&export.csv_content).unwrap(), records);
}
