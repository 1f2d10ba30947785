//! # Seed Data Generator
//!
//! Populates the database with a demo hospital and the clinical records the
//! invoice endpoints bill from.
//!
//! ## Usage
//! ```bash
//! # Seed ./medibill_dev.db
//! cargo run -p medibill-db --bin seed
//!
//! # Specify database path
//! cargo run -p medibill-db --bin seed -- --db ./data/medibill.db
//! ```
//!
//! ## Generated Records
//! - Hospital `demo-hospital` with default billing settings
//! - 3 doctors, 5 patients, 8 medications with stock
//! - One appointment per patient (mixed categories)
//! - Two prescriptions and two lab orders
//!
//! IDs are fixed (`demo-patient-1`, `demo-appt-1`, ...) so they can be used
//! directly with curl.

use chrono::{Days, Utc};
use medibill_core::clinical::{
    Appointment, Doctor, Hospital, LabOrder, LabTest, Medication, Patient, Prescription,
    PrescriptionLine,
};
use medibill_core::Money;
use medibill_db::{Database, DbConfig};
use std::env;

const HOSPITAL_ID: &str = "demo-hospital";

/// (name, specialization)
const DOCTORS: &[(&str, &str)] = &[
    ("Asha Mehta", "General Medicine"),
    ("Ravi Kumar", "Cardiology"),
    ("Nisha Rao", "Pediatrics"),
];

/// (name, contact)
const PATIENTS: &[(&str, &str)] = &[
    ("Arjun Singh", "9876500001"),
    ("Meera Iyer", "9876500002"),
    ("Kabir Das", "9876500003"),
    ("Fatima Sheikh", "9876500004"),
    ("Rohan Patel", "9876500005"),
];

/// (name, price in minor units, stock)
const MEDICATIONS: &[(&str, i64, i64)] = &[
    ("Paracetamol 500mg", 200, 500),
    ("Amoxicillin 250mg", 850, 200),
    ("Cetirizine 10mg", 150, 300),
    ("Omeprazole 20mg", 600, 150),
    ("Metformin 500mg", 350, 250),
    ("Atorvastatin 10mg", 900, 120),
    ("ORS Sachet", 2000, 80),
    ("Vitamin D3 60K", 4500, 40),
];

const CATEGORIES: &[&str] = &["Standard", "Follow-up", "Specialist", "Emergency", "Standard"];

/// (name, price in major units)
const LAB_TESTS: &[(&str, i64)] = &[
    ("Complete Blood Count", 350),
    ("Lipid Profile", 600),
    ("HbA1c", 450),
    ("Thyroid Profile", 700),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./medibill_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("MediBill Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./medibill_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 MediBill Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.clinical().count_hospitals().await?;
    if existing > 0 {
        println!("⚠ Database already has {} hospitals", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let clinical = db.clinical();
    let start = std::time::Instant::now();

    clinical
        .insert_hospital(&Hospital {
            id: HOSPITAL_ID.to_string(),
            name: "MediBill Demo Hospital".to_string(),
            address: Some("12 Lake Road, Pune".to_string()),
        })
        .await?;
    db.settings().get_or_create(HOSPITAL_ID, Some("seed")).await?;
    println!("✓ Hospital {} with default billing settings", HOSPITAL_ID);

    for (idx, (name, specialization)) in DOCTORS.iter().enumerate() {
        clinical
            .insert_doctor(&Doctor {
                id: format!("demo-doctor-{}", idx + 1),
                hospital_id: HOSPITAL_ID.to_string(),
                name: name.to_string(),
                specialization: Some(specialization.to_string()),
            })
            .await?;
    }
    println!("✓ {} doctors", DOCTORS.len());

    for (idx, (name, contact)) in PATIENTS.iter().enumerate() {
        clinical
            .insert_patient(&Patient {
                id: format!("demo-patient-{}", idx + 1),
                hospital_id: HOSPITAL_ID.to_string(),
                name: name.to_string(),
                contact: Some(contact.to_string()),
            })
            .await?;
    }
    println!("✓ {} patients", PATIENTS.len());

    for (idx, (name, price, stock)) in MEDICATIONS.iter().enumerate() {
        clinical
            .insert_medication(&Medication {
                id: format!("demo-med-{}", idx + 1),
                hospital_id: HOSPITAL_ID.to_string(),
                name: name.to_string(),
                price: Money::from_minor(*price),
                stock: *stock,
            })
            .await?;
    }
    println!("✓ {} medications", MEDICATIONS.len());

    let today = Utc::now().date_naive();
    for (idx, category) in CATEGORIES.iter().enumerate() {
        let date = today.checked_sub_days(Days::new(idx as u64)).unwrap_or(today);
        clinical
            .insert_appointment(&Appointment {
                id: format!("demo-appt-{}", idx + 1),
                hospital_id: HOSPITAL_ID.to_string(),
                patient_id: format!("demo-patient-{}", idx % PATIENTS.len() + 1),
                doctor_id: format!("demo-doctor-{}", idx % DOCTORS.len() + 1),
                category: category.to_string(),
                date,
                time: format!("{:02}:30", 9 + idx),
            })
            .await?;
    }
    println!("✓ {} appointments", CATEGORIES.len());

    for idx in 0..2 {
        let lines = (0..3)
            .map(|offset| PrescriptionLine {
                medication_id: format!("demo-med-{}", (idx * 3 + offset) % MEDICATIONS.len() + 1),
                dosage: Some("1 tablet".to_string()),
                frequency: Some("twice daily".to_string()),
                duration: Some("5 days".to_string()),
                instructions: Some("after food".to_string()),
                quantity: 10,
            })
            .collect();

        clinical
            .insert_prescription(&Prescription {
                id: format!("demo-rx-{}", idx + 1),
                hospital_id: HOSPITAL_ID.to_string(),
                patient_id: format!("demo-patient-{}", idx + 1),
                doctor_id: format!("demo-doctor-{}", idx + 1),
                lines,
            })
            .await?;
    }
    println!("✓ 2 prescriptions");

    for idx in 0..2 {
        let tests = LAB_TESTS
            .iter()
            .skip(idx * 2)
            .take(2)
            .enumerate()
            .map(|(n, (name, price))| LabTest {
                id: format!("demo-lab-{}-test-{}", idx + 1, n + 1),
                name: name.to_string(),
                price: Money::from_major(*price),
            })
            .collect();

        clinical
            .insert_lab_order(&LabOrder {
                id: format!("demo-lab-{}", idx + 1),
                hospital_id: HOSPITAL_ID.to_string(),
                patient_id: format!("demo-patient-{}", idx + 3),
                doctor_id: if idx == 0 {
                    Some("demo-doctor-2".to_string())
                } else {
                    None
                },
                tests,
            })
            .await?;
    }
    println!("✓ 2 lab orders");

    println!();
    println!("✓ Seed complete in {:?}", start.elapsed());
    println!("  Try: curl -H 'X-Hospital-Id: {}' localhost:8080/billing/settings", HOSPITAL_ID);

    Ok(())
}
