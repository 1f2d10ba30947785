//! # Line-Item Builders
//!
//! Turn clinical source documents into [`LineItemInput`]s.
//!
//! ```text
//! ┌──────────────────┬──────────────────────────────┬───────────┬──────────┐
//! │ Source           │ Lines                        │ Price     │ Tax code │
//! ├──────────────────┼──────────────────────────────┼───────────┼──────────┤
//! │ Appointment      │ 1 consultation               │ fee tier  │ 9993     │
//! │ Prescription     │ 1 per dispensed medication   │ catalog   │ 3004     │
//! │ Lab order        │ 1 per ordered test           │ test      │ 9993     │
//! │ Walk-in pharmacy │ caller items (medication id) │ caller    │ 3004     │
//! │ Walk-in lab      │ caller items                 │ caller    │ 9993     │
//! └──────────────────┴──────────────────────────────┴───────────┴──────────┘
//! ```

use crate::clinical::{Appointment, Doctor, LabOrder, Medication, PrescriptionLine};
use crate::error::ValidationError;
use crate::fees::select_consultation_fee;
use crate::invoice::LineItemInput;
use crate::settings::ConsultationFees;
use crate::types::{InvoiceType, HEALTH_SERVICES_TAX_CODE, PHARMACEUTICALS_TAX_CODE};
use crate::validation::ValidationResult;

/// Single consultation line priced from the fee schedule.
pub fn consultation_line(
    appointment: &Appointment,
    doctor: &Doctor,
    fees: &ConsultationFees,
) -> LineItemInput {
    let (tier, fee) = select_consultation_fee(fees, &appointment.category);

    let category = appointment.category.trim();
    let description = if category.is_empty() {
        format!("{} consultation with Dr. {}", tier, doctor.name)
    } else {
        format!("{} consultation with Dr. {} ({})", tier, doctor.name, category)
    };

    LineItemInput::new(description, 1, fee).with_tax_code(HEALTH_SERVICES_TAX_CODE)
}

/// One line per dispensed medication, priced from the catalog.
///
/// The caller pairs each prescription line with its catalog entry; lookup
/// failures are a not-found concern of the caller.
pub fn prescription_lines<'a, I>(lines: I) -> Vec<LineItemInput>
where
    I: IntoIterator<Item = (&'a PrescriptionLine, &'a Medication)>,
{
    lines
        .into_iter()
        .map(|(line, medication)| {
            LineItemInput::new(
                prescription_description(line, medication),
                line.quantity,
                medication.price,
            )
            .with_tax_code(PHARMACEUTICALS_TAX_CODE)
            .with_medication(medication.id.clone())
        })
        .collect()
}

fn prescription_description(line: &PrescriptionLine, medication: &Medication) -> String {
    let present = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let mut details: Vec<String> = Vec::new();
    if let Some(dosage) = present(&line.dosage) {
        details.push(dosage);
    }
    if let Some(frequency) = present(&line.frequency) {
        details.push(frequency);
    }
    if let Some(duration) = present(&line.duration) {
        details.push(format!("for {}", duration));
    }
    if let Some(instructions) = present(&line.instructions) {
        details.push(instructions);
    }

    if details.is_empty() {
        medication.name.clone()
    } else {
        format!("{} - {}", medication.name, details.join(", "))
    }
}

/// One line per ordered test at the test's price.
pub fn lab_order_lines(order: &LabOrder) -> Vec<LineItemInput> {
    order
        .tests
        .iter()
        .map(|test| {
            LineItemInput::new(format!("Lab test: {}", test.name), 1, test.price)
                .with_tax_code(HEALTH_SERVICES_TAX_CODE)
        })
        .collect()
}

/// Prepares caller-supplied walk-in items.
///
/// Missing tax codes are filled with the department's code. Pharmacy items
/// must name the medication they dispense so stock can be deducted.
pub fn walk_in_lines(
    invoice_type: InvoiceType,
    items: &[LineItemInput],
) -> ValidationResult<Vec<LineItemInput>> {
    let default_code = match invoice_type {
        InvoiceType::Pharmacy => PHARMACEUTICALS_TAX_CODE,
        InvoiceType::Laboratory | InvoiceType::Consultation => HEALTH_SERVICES_TAX_CODE,
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let mut line = item.clone();
            match invoice_type {
                InvoiceType::Pharmacy => {
                    let has_medication = line
                        .medication_id
                        .as_deref()
                        .map_or(false, |id| !id.trim().is_empty());
                    if !has_medication {
                        return Err(ValidationError::required(format!(
                            "items[{}].medicationId",
                            index
                        )));
                    }
                }
                // Only pharmacy sales move stock
                _ => line.medication_id = None,
            }
            if line.tax_code.is_none() {
                line.tax_code = Some(default_code.to_string());
            }
            Ok(line)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clinical::LabTest;
    use crate::money::Money;
    use chrono::NaiveDate;

    fn doctor() -> Doctor {
        Doctor {
            id: "d-1".into(),
            hospital_id: "h-1".into(),
            name: "Mehta".into(),
            specialization: Some("Cardiology".into()),
        }
    }

    fn appointment(category: &str) -> Appointment {
        Appointment {
            id: "a-1".into(),
            hospital_id: "h-1".into(),
            patient_id: "p-1".into(),
            doctor_id: "d-1".into(),
            category: category.into(),
            date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            time: "10:30".into(),
        }
    }

    fn medication() -> Medication {
        Medication {
            id: "m-1".into(),
            hospital_id: "h-1".into(),
            name: "Amoxicillin 500mg".into(),
            price: Money::from_minor(1250),
            stock: 100,
        }
    }

    #[test]
    fn test_consultation_line() {
        let line = consultation_line(&appointment("follow-up"), &doctor(), &ConsultationFees::default());

        assert_eq!(line.quantity, 1);
        assert_eq!(line.unit_price, Money::from_major(300));
        assert_eq!(line.tax_code.as_deref(), Some("9993"));
        assert!(line.description.contains("Dr. Mehta"));
        assert!(line.description.contains("follow-up"));
    }

    #[test]
    fn test_prescription_lines() {
        let full = PrescriptionLine {
            medication_id: "m-1".into(),
            dosage: Some("500mg".into()),
            frequency: Some("twice daily".into()),
            duration: Some("5 days".into()),
            instructions: Some("after food".into()),
            quantity: 10,
        };
        let bare = PrescriptionLine {
            dosage: None,
            frequency: Some(" ".into()),
            duration: None,
            instructions: None,
            quantity: 2,
            ..full.clone()
        };
        let med = medication();
        let lines = prescription_lines(vec![(&full, &med), (&bare, &med)]);

        assert_eq!(
            lines[0].description,
            "Amoxicillin 500mg - 500mg, twice daily, for 5 days, after food"
        );
        assert_eq!(lines[0].quantity, 10);
        assert_eq!(lines[0].unit_price, Money::from_minor(1250));
        assert_eq!(lines[0].tax_code.as_deref(), Some("3004"));
        assert_eq!(lines[0].medication_id.as_deref(), Some("m-1"));
        assert_eq!(lines[1].description, "Amoxicillin 500mg");
    }

    #[test]
    fn test_lab_order_lines() {
        let order = LabOrder {
            id: "l-1".into(),
            hospital_id: "h-1".into(),
            patient_id: "p-1".into(),
            doctor_id: None,
            tests: vec![
                LabTest { id: "t-1".into(), name: "CBC".into(), price: Money::from_major(350) },
                LabTest { id: "t-2".into(), name: "Lipid Panel".into(), price: Money::from_major(800) },
            ],
        };
        let lines = lab_order_lines(&order);

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].description, "Lab test: Lipid Panel");
        assert!(lines.iter().all(|l| l.tax_code.as_deref() == Some("9993")));
    }

    #[test]
    fn test_walk_in_pharmacy_requires_medication() {
        let items = vec![LineItemInput::new("Paracetamol", 2, Money::from_minor(300))];
        assert!(walk_in_lines(InvoiceType::Pharmacy, &items).is_err());

        let items = vec![items[0].clone().with_medication("m-1")];
        let lines = walk_in_lines(InvoiceType::Pharmacy, &items).unwrap();
        assert_eq!(lines[0].tax_code.as_deref(), Some("3004"));
    }

    #[test]
    fn test_walk_in_lab_drops_medication_and_keeps_tax_code() {
        let items = vec![
            LineItemInput::new("Blood sugar", 1, Money::from_major(150)).with_medication("m-1"),
            LineItemInput::new("Urine test", 1, Money::from_major(100)).with_tax_code("9983"),
        ];
        let lines = walk_in_lines(InvoiceType::Laboratory, &items).unwrap();

        assert_eq!(lines[0].medication_id, None);
        assert_eq!(lines[0].tax_code.as_deref(), Some("9993"));
        assert_eq!(lines[1].tax_code.as_deref(), Some("9983"));
    }
}
