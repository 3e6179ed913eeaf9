use std::io::Write;
use std::path::Path;

use citegraph_parsing::{
    BackendError, ParsingError, PlainTextBackend, SegmentationStrategy, extract_references,
    parse_citation,
};

fn write_doc(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn numbered_references_from_text_file() {
    let doc = write_doc(
        "Deep Things\n\nAbstract. We study things [1, 2].\n\u{0C}\
         6 Conclusion\nThings work.\n\nReferences\n\n\
         [1] Smith, J. (2020). A Great Paper. In Proc. ICML.\n\
         [2] Doe, A. (2019). Another Paper.\n\
         [3] Vaswani, A., Shazeer, N. (2017). Attention is all\n\
         you need. In Advances in Neural Information Processing.\n\
         \u{0C}Appendix A\n\n[9] Not a reference at all, just appendix text from 2021.\n",
    );

    let result = extract_references(doc.path(), &PlainTextBackend).unwrap();
    assert_eq!(result.header_page, Some(1));
    assert_eq!(result.strategy, Some(SegmentationStrategy::Numbered));
    assert_eq!(result.references.len(), 3);
    assert_eq!(result.references[0], "Smith, J. (2020). A Great Paper. In Proc. ICML.");
    assert_eq!(result.references[1], "Doe, A. (2019). Another Paper.");
    assert!(result.references[2].contains("Attention is all you need"));

    let third = parse_citation(&result.references[2]);
    assert_eq!(third.year, Some(2017));
    assert_eq!(third.title.as_deref(), Some("Attention is all you need"));
}

#[test]
fn author_year_list_without_header() {
    let doc = write_doc(
        "Lee, K. (2015). Graph methods for citation analysis. Journal of Informetrics.\n\
         Park, S. (2018). Another study of reference networks. Scientometrics 12.\n",
    );
    let result = extract_references(doc.path(), &PlainTextBackend).unwrap();
    assert_eq!(result.header_page, None);
    assert_eq!(result.strategy, Some(SegmentationStrategy::AuthorYear));
    assert_eq!(result.references.len(), 2);

    let first = parse_citation(&result.references[0]);
    assert_eq!(first.venue.as_deref(), Some("Journal of Informetrics"));
}

#[test]
fn document_without_references_is_empty() {
    let doc = write_doc("Just a memo.\nNothing cited here.\n");
    let result = extract_references(doc.path(), &PlainTextBackend).unwrap();
    assert!(result.references.is_empty());
}

#[test]
fn unreadable_input_is_an_error() {
    let err = extract_references(Path::new("/no/such/file.txt"), &PlainTextBackend).unwrap_err();
    assert!(matches!(err, ParsingError::Backend(BackendError::Open(_))));
}
