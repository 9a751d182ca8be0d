use crate::context::TemplateContext;
use crate::ops::EditOperation;

/// One case-insensitive `ReplaceAllText` per resolved marker, in marker order.
///
/// Rich-slot markers are included: at this stage their sentinel is plain text.
/// Markers absent from the document match nothing remotely.
pub fn substitution_batch(context: &TemplateContext) -> Vec<EditOperation> {
    context
        .substitutions()
        .map(|(marker, value)| EditOperation::replace_all(marker, value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::Marker;

    #[test]
    fn test_one_replace_per_marker() {
        let mut builder = TemplateContext::builder();
        builder
            .set(Marker::scalar("fecha"), "18 de octubre de 2026")
            .set(Marker::scalar("empresa"), "Acme");
        let context = builder.build().unwrap();

        let batch = substitution_batch(&context);
        assert_eq!(
            batch,
            vec![
                EditOperation::replace_all("<-empresa->", "Acme"),
                EditOperation::replace_all("<-fecha->", "18 de octubre de 2026"),
            ]
        );
    }

    #[test]
    fn test_empty_context_yields_empty_batch() {
        let context = TemplateContext::builder().build().unwrap();
        assert!(substitution_batch(&context).is_empty());
    }
}
