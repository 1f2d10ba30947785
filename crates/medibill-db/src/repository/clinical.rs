//! # Clinical Repository
//!
//! Hospitals, patients, doctors, appointments, prescriptions, lab orders and
//! the medication catalog.
//!
//! Billing only reads these (plus stock deduction, which lives in the invoice
//! transaction). The insert methods exist for the seed binary and tests.
//! Every lookup is scoped to a hospital: a document belonging to another
//! tenant is reported as not found.

use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use medibill_core::clinical::{
    Appointment, Doctor, Hospital, LabOrder, LabTest, Medication, Patient, Prescription,
    PrescriptionLine,
};
use medibill_core::Money;

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct AppointmentRow {
    id: String,
    hospital_id: String,
    patient_id: String,
    doctor_id: String,
    category: String,
    appointment_date: NaiveDate,
    appointment_time: String,
}

impl From<AppointmentRow> for Appointment {
    fn from(row: AppointmentRow) -> Self {
        Appointment {
            id: row.id,
            hospital_id: row.hospital_id,
            patient_id: row.patient_id,
            doctor_id: row.doctor_id,
            category: row.category,
            date: row.appointment_date,
            time: row.appointment_time,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PrescriptionLineRow {
    medication_id: String,
    dosage: Option<String>,
    frequency: Option<String>,
    duration: Option<String>,
    instructions: Option<String>,
    quantity: i64,
}

impl From<PrescriptionLineRow> for PrescriptionLine {
    fn from(row: PrescriptionLineRow) -> Self {
        PrescriptionLine {
            medication_id: row.medication_id,
            dosage: row.dosage,
            frequency: row.frequency,
            duration: row.duration,
            instructions: row.instructions,
            quantity: row.quantity,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MedicationRow {
    id: String,
    hospital_id: String,
    name: String,
    price: i64,
    stock: i64,
}

impl From<MedicationRow> for Medication {
    fn from(row: MedicationRow) -> Self {
        Medication {
            id: row.id,
            hospital_id: row.hospital_id,
            name: row.name,
            price: Money::from_minor(row.price),
            stock: row.stock,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for clinical collaborator records.
#[derive(Debug, Clone)]
pub struct ClinicalRepository {
    pool: SqlitePool,
}

impl ClinicalRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ClinicalRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Hospitals
    // -------------------------------------------------------------------------

    pub async fn get_hospital(&self, id: &str) -> DbResult<Option<Hospital>> {
        let row: Option<(String, String, Option<String>)> =
            sqlx::query_as("SELECT id, name, address FROM hospitals WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(id, name, address)| Hospital { id, name, address }))
    }

    pub async fn insert_hospital(&self, hospital: &Hospital) -> DbResult<()> {
        debug!(id = %hospital.id, "Inserting hospital");

        sqlx::query("INSERT INTO hospitals (id, name, address, created_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(&hospital.id)
            .bind(&hospital.name)
            .bind(&hospital.address)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn count_hospitals(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM hospitals")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // -------------------------------------------------------------------------
    // Patients & Doctors
    // -------------------------------------------------------------------------

    pub async fn get_patient(&self, hospital_id: &str, id: &str) -> DbResult<Option<Patient>> {
        let row: Option<(String, String, String, Option<String>)> = sqlx::query_as(
            "SELECT id, hospital_id, name, contact FROM patients WHERE id = ?1 AND hospital_id = ?2",
        )
        .bind(id)
        .bind(hospital_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, hospital_id, name, contact)| Patient {
            id,
            hospital_id,
            name,
            contact,
        }))
    }

    pub async fn insert_patient(&self, patient: &Patient) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO patients (id, hospital_id, name, contact, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&patient.id)
        .bind(&patient.hospital_id)
        .bind(&patient.name)
        .bind(&patient.contact)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_doctor(&self, hospital_id: &str, id: &str) -> DbResult<Option<Doctor>> {
        let row: Option<(String, String, String, Option<String>)> = sqlx::query_as(
            "SELECT id, hospital_id, name, specialization FROM doctors WHERE id = ?1 AND hospital_id = ?2",
        )
        .bind(id)
        .bind(hospital_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, hospital_id, name, specialization)| Doctor {
            id,
            hospital_id,
            name,
            specialization,
        }))
    }

    pub async fn insert_doctor(&self, doctor: &Doctor) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO doctors (id, hospital_id, name, specialization, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&doctor.id)
        .bind(&doctor.hospital_id)
        .bind(&doctor.name)
        .bind(&doctor.specialization)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Appointments
    // -------------------------------------------------------------------------

    pub async fn get_appointment(&self, hospital_id: &str, id: &str) -> DbResult<Option<Appointment>> {
        let row = sqlx::query_as::<_, AppointmentRow>(
            r#"
            SELECT id, hospital_id, patient_id, doctor_id, category,
                   appointment_date, appointment_time
            FROM appointments
            WHERE id = ?1 AND hospital_id = ?2
            "#,
        )
        .bind(id)
        .bind(hospital_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Appointment::from))
    }

    pub async fn insert_appointment(&self, appointment: &Appointment) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO appointments (
                id, hospital_id, patient_id, doctor_id, category,
                appointment_date, appointment_time, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&appointment.id)
        .bind(&appointment.hospital_id)
        .bind(&appointment.patient_id)
        .bind(&appointment.doctor_id)
        .bind(&appointment.category)
        .bind(appointment.date)
        .bind(&appointment.time)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Prescriptions
    // -------------------------------------------------------------------------

    pub async fn get_prescription(&self, hospital_id: &str, id: &str) -> DbResult<Option<Prescription>> {
        let header: Option<(String, String, String, String)> = sqlx::query_as(
            "SELECT id, hospital_id, patient_id, doctor_id FROM prescriptions WHERE id = ?1 AND hospital_id = ?2",
        )
        .bind(id)
        .bind(hospital_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((id, hospital_id, patient_id, doctor_id)) = header else {
            return Ok(None);
        };

        let lines = sqlx::query_as::<_, PrescriptionLineRow>(
            r#"
            SELECT medication_id, dosage, frequency, duration, instructions, quantity
            FROM prescription_lines
            WHERE prescription_id = ?1
            ORDER BY line_no
            "#,
        )
        .bind(&id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(Prescription {
            id,
            hospital_id,
            patient_id,
            doctor_id,
            lines: lines.into_iter().map(PrescriptionLine::from).collect(),
        }))
    }

    pub async fn insert_prescription(&self, prescription: &Prescription) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO prescriptions (id, hospital_id, patient_id, doctor_id, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&prescription.id)
        .bind(&prescription.hospital_id)
        .bind(&prescription.patient_id)
        .bind(&prescription.doctor_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        for (line_no, line) in prescription.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO prescription_lines (
                    id, prescription_id, line_no, medication_id,
                    dosage, frequency, duration, instructions, quantity
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&prescription.id)
            .bind(line_no as i64)
            .bind(&line.medication_id)
            .bind(&line.dosage)
            .bind(&line.frequency)
            .bind(&line.duration)
            .bind(&line.instructions)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Lab Orders
    // -------------------------------------------------------------------------

    pub async fn get_lab_order(&self, hospital_id: &str, id: &str) -> DbResult<Option<LabOrder>> {
        let header: Option<(String, String, String, Option<String>)> = sqlx::query_as(
            "SELECT id, hospital_id, patient_id, doctor_id FROM lab_orders WHERE id = ?1 AND hospital_id = ?2",
        )
        .bind(id)
        .bind(hospital_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((id, hospital_id, patient_id, doctor_id)) = header else {
            return Ok(None);
        };

        let tests: Vec<(String, String, i64)> = sqlx::query_as(
            "SELECT id, name, price FROM lab_order_tests WHERE lab_order_id = ?1 ORDER BY line_no",
        )
        .bind(&id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(LabOrder {
            id,
            hospital_id,
            patient_id,
            doctor_id,
            tests: tests
                .into_iter()
                .map(|(id, name, price)| LabTest {
                    id,
                    name,
                    price: Money::from_minor(price),
                })
                .collect(),
        }))
    }

    pub async fn insert_lab_order(&self, order: &LabOrder) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO lab_orders (id, hospital_id, patient_id, doctor_id, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&order.id)
        .bind(&order.hospital_id)
        .bind(&order.patient_id)
        .bind(&order.doctor_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        for (line_no, test) in order.tests.iter().enumerate() {
            sqlx::query(
                "INSERT INTO lab_order_tests (id, lab_order_id, line_no, name, price) VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(&test.id)
            .bind(&order.id)
            .bind(line_no as i64)
            .bind(&test.name)
            .bind(test.price.minor())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Medications
    // -------------------------------------------------------------------------

    pub async fn get_medication(&self, hospital_id: &str, id: &str) -> DbResult<Option<Medication>> {
        let row = sqlx::query_as::<_, MedicationRow>(
            "SELECT id, hospital_id, name, price, stock FROM medications WHERE id = ?1 AND hospital_id = ?2",
        )
        .bind(id)
        .bind(hospital_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Medication::from))
    }

    pub async fn insert_medication(&self, medication: &Medication) -> DbResult<()> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO medications (id, hospital_id, name, price, stock, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&medication.id)
        .bind(&medication.hospital_id)
        .bind(&medication.name)
        .bind(medication.price.minor())
        .bind(medication.stock)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
