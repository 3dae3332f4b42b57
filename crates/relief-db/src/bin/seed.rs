//! # Seed Data Generator
//!
//! Fills an empty database with a small relief operation for local runs.
//!
//! ## Usage
//! ```bash
//! cargo run -p relief-db --bin seed
//! cargo run -p relief-db --bin seed -- --db ./data/relief.db
//! ```
//!
//! ## Generated Data
//! - admin account `admin@relief.local`
//! - verified NGO with resource permission
//! - two volunteers and one victim
//! - resource types: water, food, medical kit, blanket, tent
//! - stock for every type, held by the NGO
//! - one SOS request with a linked task
//!
//! Every account's password is `relief123`.

use std::env;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use relief_core::{
    NewNgo, NewResourceStock, NewResourceType, NewSosRequest, NewTask, NewUser, NewVictim,
    NewVolunteer, TaskType, UrgencyLevel,
};
use relief_db::{Database, DbConfig};

const PASSWORD: &str = "relief123";

/// Catalogue: name, unit, opening stock.
const RESOURCES: &[(&str, &str, i64)] = &[
    ("Water", "litre", 2000),
    ("Food", "pack", 500),
    ("Medical kit", "kit", 40),
    ("Blanket", "piece", 300),
    ("Tent", "piece", 8),
];

fn account(name: &str, email: &str, location: &str) -> NewUser {
    NewUser {
        name: name.to_string(),
        email: email.to_string(),
        phone: None,
        password: PASSWORD.to_string(),
        location: Some(location.to_string()),
        language: None,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,relief_db=info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./relief_dev.db");

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
                println!("Relief Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./relief_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Relief Seed Data Generator");
    println!("==========================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("opening {}", db_path))?;
    println!("✓ Connected, migrations applied");

    let existing = db.users().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} accounts", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let admin = db
        .users()
        .create_admin(&account("Coordinator", "admin@relief.local", "Dhaka"))
        .await?;
    println!("✓ Admin: {}", admin.email);

    let (ngo, _) = db
        .ngos()
        .register(
            &account("Nusrat Jahan", "contact@riveraid.local", "Sylhet"),
            &NewNgo {
                org_name: "River Aid".to_string(),
                registration_doc: Some("docs/river-aid-registration.pdf".to_string()),
                region: Some("Sylhet".to_string()),
                contact_person: Some("Nusrat Jahan".to_string()),
            },
        )
        .await?;
    db.ngos().grant_resource_permission(&ngo.id).await?;
    println!("✓ NGO: River Aid (verified, manages resources)");

    let mut volunteers = Vec::new();
    for (name, email, skills) in [
        ("Tanvir Ahmed", "tanvir@volunteer.local", "boat, first aid"),
        ("Mitu Akter", "mitu@volunteer.local", "nursing"),
    ] {
        let (volunteer, _) = db
            .volunteers()
            .register(
                &account(name, email, "Sylhet"),
                &NewVolunteer {
                    skills: Some(skills.to_string()),
                },
            )
            .await?;
        db.volunteers().set_verified(&volunteer.id, true).await?;
        volunteers.push(volunteer);
    }
    println!("✓ Volunteers: {}", volunteers.len());

    let (victim, _) = db
        .victims()
        .register(
            &account("Abdul Karim", "karim@victim.local", "Companiganj"),
            &NewVictim {
                vulnerability_notes: Some("elderly parent, limited mobility".to_string()),
            },
        )
        .await?;
    println!("✓ Victim: {}", victim.email);

    for (name, unit, quantity) in RESOURCES {
        let resource_type = db
            .resources()
            .add_type(&NewResourceType {
                name: name.to_string(),
                unit: Some(unit.to_string()),
                description: None,
            })
            .await?;
        db.resources()
            .add_stock(&NewResourceStock {
                resource_type_id: resource_type.id,
                owner_ngo_id: Some(ngo.id.clone()),
                quantity: *quantity,
                location: Some("Sylhet depot".to_string()),
            })
            .await?;
    }
    println!("✓ Resource types and stock: {}", RESOURCES.len());

    let request = db
        .sos()
        .submit(
            &victim.id,
            &NewSosRequest {
                location: "Companiganj, Sylhet".to_string(),
                latitude: Some(25.06),
                longitude: Some(91.75),
                type_of_need: "rescue".to_string(),
                description: "Water rising, three people on the roof".to_string(),
                urgency: Some(UrgencyLevel::Critical),
            },
        )
        .await?;

    db.tasks()
        .create(&NewTask {
            title: "Boat rescue at Companiganj".to_string(),
            description: Some(request.description.clone()),
            task_type: Some(TaskType::Rescue),
            related_request_id: Some(request.id.clone()),
            location: Some(request.location.clone()),
            created_by: Some(admin.id.clone()),
        })
        .await?;
    println!("✓ SOS request and task");

    println!();
    println!("✓ Seed complete! Log in with any account above, password '{}'.", PASSWORD);

    Ok(())
}
