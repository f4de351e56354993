//! Single-page A4 invoice layout.

use printpdf::{BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point};

use super::{InvoiceDocument, InvoiceRenderer, RenderError};

const LEFT: u16 = 20;
const RIGHT: u16 = 190;
const VALUE_COLUMN: u16 = 75;

/// Default renderer using the built-in Helvetica faces.
#[derive(Debug, Clone, Copy, Default)]
pub struct A4InvoiceRenderer;

fn mm(value: u16) -> Mm {
    Mm(f32::from(value))
}

fn text(layer: &PdfLayerReference, font: &IndirectFontRef, value: &str, size: f32, x: u16, y: u16) {
    layer.use_text(value, size, mm(x), mm(y), font);
}

fn rule(layer: &PdfLayerReference, y: u16) {
    layer.add_line(Line {
        points: vec![
            (Point::new(mm(LEFT), mm(y)), false),
            (Point::new(mm(RIGHT), mm(y)), false),
        ],
        is_closed: false,
    });
}

impl InvoiceRenderer for A4InvoiceRenderer {
    fn render(&self, document: &InvoiceDocument) -> Result<Vec<u8>, RenderError> {
        let title = format!("Factura {}", document.invoice_number);
        let (doc, page, layer) = PdfDocument::new(&title, Mm(210.0), Mm(297.0), "Factura");
        let layer = doc.get_page(page).get_layer(layer);

        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| RenderError(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| RenderError(e.to_string()))?;

        text(&layer, &bold, "FACTURA", 22.0, LEFT, 272);
        text(&layer, &bold, &document.invoice_number, 12.0, 140, 272);
        text(
            &layer,
            &regular,
            &document.issued_at.format("%d/%m/%Y %H:%M").to_string(),
            10.0,
            140,
            266,
        );
        rule(&layer, 260);

        let mut rows: Vec<(&str, String)> = vec![
            ("NIT/CI:", document.tax_id.clone()),
            ("Razón social:", document.legal_name.clone()),
            ("Caso:", document.case_title.clone()),
            (
                "Concepto:",
                document
                    .concept_name
                    .clone()
                    .unwrap_or_else(|| "Sin concepto".to_string()),
            ),
            ("Método de pago:", document.method_label.clone()),
            (
                "Fecha de pago:",
                document.paid_at.format("%d/%m/%Y %H:%M").to_string(),
            ),
        ];
        if let Some(code) = &document.control_code {
            rows.push(("Código de control:", code.clone()));
        }

        let mut y: u16 = 248;
        for (label, value) in &rows {
            text(&layer, &bold, label, 11.0, LEFT, y);
            text(&layer, &regular, value, 11.0, VALUE_COLUMN, y);
            y = y.saturating_sub(9);
        }

        y = y.saturating_sub(2);
        rule(&layer, y);
        y = y.saturating_sub(12);
        text(&layer, &bold, "TOTAL:", 14.0, 120, y);
        text(
            &layer,
            &bold,
            &format!("{:.2} {}", document.amount, document.currency.to_uppercase()),
            14.0,
            145,
            y,
        );

        text(
            &layer,
            &regular,
            "Documento generado por el sistema de gestión de casos.",
            8.0,
            LEFT,
            15,
        );

        doc.save_to_bytes().map_err(|e| RenderError(e.to_string()))
    }
}
