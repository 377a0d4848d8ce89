/// Command-line front end for the appointment portal.
///
/// Signs a patient or doctor in, then offers the booking screens for that
/// role. Without `CAREBOOK_API_URL` it runs against a seeded in-memory store.

use std::io::{self, Write};
use std::sync::Arc;

use carebook::config::{self, PortalConfig};
use carebook::notice::{Notice, NoticeLevel};
use carebook::portal::PatientPortal;
use carebook::schedule::ScheduleManager;
use carebook::store::{AppointmentStore, HttpStore, MemoryStore};
use carebook::{Appointment, AppointmentStatus, Role, Session, StatusFilter, TransitionAction};
use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone, Utc};
use tracing_subscriber::EnvFilter;

const DEMO_TOKEN: &str = "demo-token";

fn format_when(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%a, %Y-%m-%d %H:%M").to_string()
}

/// Parse a local `YYYY-MM-DD HH:MM` entry.
fn parse_when(input: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(input.trim(), "%Y-%m-%d %H:%M").ok()?;
    Local
        .from_local_datetime(&naive)
        .single()
        .map(|local| local.with_timezone(&Utc))
}

fn print_notices(notices: Vec<Notice>) {
    for notice in notices {
        let tag = match notice.level {
            NoticeLevel::Info => "ok",
            NoticeLevel::Error => "error",
            NoticeLevel::Alert => "ALERT",
        };
        println!("  [{}] {}", tag, notice.message);
    }
}

fn print_appointment_line(index: usize, apt: &Appointment) {
    let who = match (apt.doctor_name(), apt.patient_name()) {
        (_, Some(patient)) => patient.to_string(),
        (Some(doctor), None) => format!("Dr. {doctor}"),
        (None, None) => apt.doctor_id().to_string(),
    };
    println!(
        "  {:2}. {} | {:18} | {:12} | {}",
        index + 1,
        format_when(apt.scheduled_at()),
        who,
        apt.department(),
        apt.status().label()
    );
}

struct PortalCli<S> {
    store: Arc<S>,
    demo_store: bool,
    session: Option<Session>,
    patient: Option<PatientPortal<S>>,
    schedule: Option<ScheduleManager<S>>,
    running: bool,
}

impl<S: AppointmentStore> PortalCli<S> {
    fn new(store: Arc<S>, demo_store: bool) -> Self {
        PortalCli {
            store,
            demo_store,
            session: None,
            patient: None,
            schedule: None,
            running: true,
        }
    }

    fn print_header(&self) {
        println!("\n{}", "=".repeat(60));
        println!("       {} APPOINTMENTS v{}", config::APP_NAME.to_uppercase(), config::APP_VERSION);
        println!("{}", "=".repeat(60));
    }

    fn print_menu(&self) {
        match self.session.as_ref().map(Session::role) {
            None => {
                println!("\n--- Main Menu ---");
                println!("1. Sign in as patient");
                println!("2. Sign in as doctor");
                println!("3. Run demo");
            }
            Some(Role::Patient) => {
                println!("\n--- Patient Menu ---");
                println!("1. New appointment");
                println!("2. View my appointments");
                println!("3. Search appointments");
                println!("4. Filter by status");
                println!("5. Show/hide appointment details");
                println!("6. Refresh");
                println!("8. Sign out");
            }
            Some(Role::Doctor) => {
                println!("\n--- Doctor Menu ---");
                println!("1. View schedule");
                println!("2. Filter by status");
                println!("3. Approve / decline / complete");
                println!("4. View appointment details");
                println!("5. Refresh");
                println!("8. Sign out");
            }
        }
        println!("9. Exit");
        println!("{}", "-".repeat(20));
    }

    fn get_input(&mut self, prompt: &str, default: Option<&str>) -> String {
        if let Some(def) = default {
            print!("{} [{}]: ", prompt, def);
        } else {
            print!("{}: ", prompt);
        }
        let _ = io::stdout().flush();

        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) | Err(_) => {
                // stdin closed
                self.running = false;
                return default.unwrap_or("").to_string();
            }
            Ok(_) => {}
        }
        let input = input.trim();

        if input.is_empty() {
            default.unwrap_or("").to_string()
        } else {
            input.to_string()
        }
    }

    fn get_int_input(&mut self, prompt: &str, default: Option<i32>) -> i32 {
        loop {
            let default_str = default.map(|d| d.to_string());
            let input = self.get_input(prompt, default_str.as_deref());

            if let Ok(value) = input.parse::<i32>() {
                return value;
            }
            if !self.running {
                return default.unwrap_or(0);
            }
            println!("Please enter a valid number");
        }
    }

    fn get_status_filter(&mut self) -> Option<StatusFilter> {
        let choice = self.get_input("Status (all/pending/approved/cancelled/completed)", Some("all"));
        match StatusFilter::from_string(&choice) {
            Ok(filter) => Some(filter),
            Err(e) => {
                println!("{}", e);
                None
            }
        }
    }

    async fn login(&mut self, role: Role) {
        println!("\n--- Sign in as {} ---", role);
        let default_id = match role {
            Role::Patient => "P1",
            Role::Doctor => "D1",
        };
        let user_id = self.get_input("User ID", Some(default_id));
        let token = if self.demo_store {
            DEMO_TOKEN.to_string()
        } else {
            self.get_input("Bearer token", None)
        };

        let session = match Session::login(role, &user_id, &token) {
            Ok(session) => session,
            Err(e) => {
                println!("Sign-in failed: {}", e);
                return;
            }
        };

        match role {
            Role::Patient => {
                let mut portal = PatientPortal::new(self.store.clone());
                match portal.open(&session).await {
                    Ok(count) => println!("\nSigned in as patient {} ({} appointments)", user_id, count),
                    Err(e) => println!("\nSigned in, but appointments could not be loaded: {}", e),
                }
                self.patient = Some(portal);
            }
            Role::Doctor => {
                let schedule = ScheduleManager::new(self.store.clone());
                match schedule.load(&session).await {
                    Ok(count) => println!("\nSigned in as doctor {} ({} appointments)", user_id, count),
                    Err(e) => println!("\nSigned in, but the schedule could not be loaded: {}", e),
                }
                self.schedule = Some(schedule);
            }
        }
        self.session = Some(session);
    }

    fn logout(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.logout();
            println!("\nSigned out (signed in since {})", format_when(session.opened_at()));
        }
        self.patient = None;
        self.schedule = None;
    }

    async fn new_booking(&mut self) {
        let (Some(session), Some(mut portal)) = (self.session.take(), self.patient.take()) else {
            return;
        };
        println!("\n--- New Appointment ---");
        portal.start_booking();

        let specialties = portal.composer.specialties().to_vec();
        if specialties.is_empty() {
            println!("No specialties available");
        } else {
            println!("Specialties: {}", specialties.join(", "));
        }
        let specialty = self.get_input("Medical specialty", specialties.first().map(String::as_str));

        match portal.composer.select_specialty(&session, &specialty).await {
            Ok(doctors) if doctors.is_empty() => println!("No doctors available for {}", specialty),
            Ok(doctors) => {
                println!("\nAvailable doctors:");
                for doctor in doctors {
                    println!("  {} - Dr. {} ({})", doctor.id, doctor.name, doctor.specialization);
                }
            }
            Err(e) => println!("Error loading doctors: {}", e),
        }

        let default_doctor = portal.composer.available_doctors().first().map(|d| d.id.clone());
        let doctor_id = self.get_input("Doctor ID", default_doctor.as_deref());
        if let Err(e) = portal.composer.select_doctor(&doctor_id) {
            println!("{}", e);
        }

        let earliest = portal.composer.earliest_schedule();
        println!("Earliest possible time: {}", format_when(earliest));
        let suggested = (Local::now() + Duration::days(1)).format("%Y-%m-%d 10:00").to_string();
        let when = self.get_input("Date and time (YYYY-MM-DD HH:MM)", Some(suggested.as_str()));
        match parse_when(&when) {
            Some(at) if at < earliest => println!("{} is in the past", format_when(at)),
            Some(at) => portal.composer.set_schedule(at),
            None => println!("Could not read '{}' as a date and time", when),
        }

        let description = self.get_input("Reason for visit", Some(""));
        portal.composer.set_description(&description);
        let notes = self.get_input("Additional notes", Some(""));
        portal.composer.set_notes(&notes);

        match portal.submit_booking(&session).await {
            Ok(created) => println!("\nRequested {} ({})", format_when(created.scheduled_at()), created.status()),
            Err(e) => {
                println!("\nBooking not submitted: {}", e);
                portal.back_to_list();
            }
        }
        print_notices(portal.take_notices());

        self.session = Some(session);
        self.patient = Some(portal);
    }

    fn view_bookings(&self) {
        let Some(portal) = &self.patient else { return };
        let visible = portal.bookings.visible();

        println!(
            "\n--- My Appointments ({} shown, search '{}', status {}) ---",
            visible.len(),
            portal.bookings.search(),
            portal.bookings.status_filter()
        );
        if visible.is_empty() {
            println!("No appointments found");
            return;
        }
        for (i, apt) in visible.iter().enumerate() {
            print_appointment_line(i, apt);
            if portal.bookings.is_expanded(apt.id()) {
                if let Some(detail) = portal.bookings.expanded() {
                    println!("      Reason: {}", detail.description.unwrap_or("-"));
                    println!("      Notes:  {}", detail.notes.unwrap_or("-"));
                    println!("      ID:     {}", detail.id);
                }
            }
        }
    }

    fn search_bookings(&mut self) {
        let term = self.get_input("Search doctor or department", Some(""));
        if let Some(portal) = &mut self.patient {
            portal.bookings.set_search(&term);
        }
        self.view_bookings();
    }

    fn filter_bookings(&mut self) {
        if let Some(filter) = self.get_status_filter() {
            if let Some(portal) = &mut self.patient {
                portal.bookings.set_status_filter(filter);
            }
        }
        self.view_bookings();
    }

    fn toggle_booking(&mut self) {
        self.view_bookings();
        let choice = self.get_int_input("Select appointment (0 to go back)", Some(0));
        let Some(portal) = &mut self.patient else { return };
        if choice <= 0 {
            return;
        }
        let id = portal
            .bookings
            .visible()
            .get(choice as usize - 1)
            .map(|apt| apt.id().to_string());
        match id {
            Some(id) => {
                if let Err(e) = portal.bookings.toggle(&id) {
                    println!("{}", e);
                }
            }
            None => println!("Invalid choice"),
        }
        self.view_bookings();
    }

    async fn refresh(&mut self) {
        let Some(session) = &self.session else { return };
        let result = match (&mut self.patient, &self.schedule) {
            (Some(portal), _) => {
                let result = portal.bookings.refresh(session).await;
                print_notices(portal.take_notices());
                result
            }
            (None, Some(schedule)) => schedule.load(session).await,
            (None, None) => return,
        };
        match result {
            Ok(count) => println!("\nLoaded {} appointments", count),
            Err(e) => println!("\nRefresh failed: {}", e),
        }
    }

    fn view_schedule(&self) {
        let Some(schedule) = &self.schedule else { return };
        let (Ok(summary), Ok(visible), Ok(filter)) = (schedule.summary(), schedule.visible(), schedule.filter()) else {
            println!("Schedule unavailable");
            return;
        };

        println!(
            "\n--- Schedule: {} total, {} pending, {} approved ---",
            summary.total, summary.pending, summary.approved
        );
        let heading = match filter {
            StatusFilter::All => "All Appointments",
            StatusFilter::Only(status) => status.label(),
        };
        println!("{}", heading);
        if let Ok(Some(message)) = schedule.empty_message() {
            println!("{}", message);
            return;
        }
        for (i, apt) in visible.iter().enumerate() {
            print_appointment_line(i, apt);
            if let Ok(Some(failure)) = schedule.failure_for(apt.id()) {
                println!("      Last change failed: {}", failure);
            }
        }
    }

    fn filter_schedule(&mut self) {
        if let Some(filter) = self.get_status_filter() {
            if let Some(schedule) = &self.schedule {
                let _ = schedule.set_filter(filter);
            }
        }
        self.view_schedule();
    }

    fn pick_scheduled(&mut self) -> Option<Appointment> {
        self.view_schedule();
        let choice = self.get_int_input("Select appointment (0 to go back)", Some(0));
        if choice <= 0 {
            return None;
        }
        let visible = self.schedule.as_ref()?.visible().ok()?;
        let picked = visible.into_iter().nth(choice as usize - 1);
        if picked.is_none() {
            println!("Invalid choice");
        }
        picked
    }

    async fn change_status(&mut self) {
        let Some(apt) = self.pick_scheduled() else { return };
        let actions = TransitionAction::available_for(apt.status());
        if actions.is_empty() {
            println!("\nAppointment is {}; no further changes are possible", apt.status());
            return;
        }
        for (i, action) in actions.iter().enumerate() {
            println!("  {}. {}", i + 1, action.name());
        }
        let choice = self.get_int_input("Select action (0 to go back)", Some(0));
        if choice <= 0 {
            return;
        }
        let Some(action) = actions.get(choice as usize - 1).copied() else {
            println!("Invalid choice");
            return;
        };

        let (Some(session), Some(schedule)) = (&self.session, &self.schedule) else { return };
        match schedule.perform(session, apt.id(), action).await {
            Ok(updated) => println!("\nAppointment is now {}", updated.status()),
            Err(e) => println!("\nStatus not changed: {}", e),
        }
        if let Ok(notices) = schedule.take_notices() {
            print_notices(notices);
        }
    }

    async fn view_details(&mut self) {
        let Some(apt) = self.pick_scheduled() else { return };
        let Some(schedule) = &self.schedule else { return };
        if let Err(e) = schedule.open_detail(apt.id()) {
            println!("{}", e);
            return;
        }

        println!("\n--- Appointment Details ---");
        println!("  Patient:   {}", apt.patient_name().unwrap_or(apt.patient_id()));
        println!("  When:      {}", format_when(apt.scheduled_at()));
        println!("  Status:    {}", apt.status().label());
        println!("  Reason:    {}", apt.description().unwrap_or("-"));
        println!("  Notes:     {}", apt.notes().unwrap_or("-"));
        println!("  ID:        {}", apt.id());

        let actions = schedule.detail_actions().unwrap_or(&[]);
        if !actions.is_empty() {
            println!("\n  1. Approve Appointment");
            println!("  2. Cancel Appointment");
            let choice = self.get_int_input("Select action (0 to close)", Some(0));
            let action = match choice {
                1 => Some(TransitionAction::Approve),
                2 => Some(TransitionAction::Decline),
                _ => None,
            };
            let (Some(session), Some(schedule)) = (&self.session, &self.schedule) else { return };
            if let Some(action) = action {
                match schedule.confirm_detail(session, action).await {
                    Ok(updated) => println!("\nAppointment is now {}", updated.status()),
                    Err(e) => println!("\nStatus not changed: {}", e),
                }
                if let Ok(notices) = schedule.take_notices() {
                    print_notices(notices);
                }
            }
        }
        if let Some(schedule) = &self.schedule {
            let _ = schedule.close_detail();
        }
    }

    async fn handle_choice(&mut self, choice: i32) {
        match (self.session.as_ref().map(Session::role), choice) {
            (_, 9) => {
                self.running = false;
                println!("\nGoodbye!");
            }
            (None, 1) => self.login(Role::Patient).await,
            (None, 2) => self.login(Role::Doctor).await,
            (None, 3) => run_demo().await,
            (Some(_), 8) => self.logout(),
            (Some(Role::Patient), 1) => self.new_booking().await,
            (Some(Role::Patient), 2) => self.view_bookings(),
            (Some(Role::Patient), 3) => self.search_bookings(),
            (Some(Role::Patient), 4) => self.filter_bookings(),
            (Some(Role::Patient), 5) => self.toggle_booking(),
            (Some(Role::Patient), 6) => self.refresh().await,
            (Some(Role::Doctor), 1) => self.view_schedule(),
            (Some(Role::Doctor), 2) => self.filter_schedule(),
            (Some(Role::Doctor), 3) => self.change_status().await,
            (Some(Role::Doctor), 4) => self.view_details().await,
            (Some(Role::Doctor), 5) => self.refresh().await,
            _ => println!("Invalid choice"),
        }
    }

    async fn run(&mut self) {
        self.print_header();

        while self.running {
            self.print_menu();
            let choice = self.get_int_input("Enter choice", None);
            if !self.running {
                break;
            }
            self.handle_choice(choice).await;
        }
    }
}

/// Walk one booking through both sides of the portal.
async fn run_demo() {
    println!("\n--- Running Demo ---");

    let store = Arc::new(MemoryStore::demo());
    let (patient, doctor) = match (
        Session::login(Role::Patient, "P1", DEMO_TOKEN),
        Session::login(Role::Doctor, "D1", DEMO_TOKEN),
    ) {
        (Ok(patient), Ok(doctor)) => (patient, doctor),
        (Err(e), _) | (_, Err(e)) => {
            println!("Demo sign-in failed: {}", e);
            return;
        }
    };

    let mut portal = PatientPortal::new(store.clone());
    if let Err(e) = portal.open(&patient).await {
        println!("Could not open patient screen: {}", e);
        return;
    }

    let tomorrow = Local::now() + Duration::days(1);
    let requests = [("Annual checkup", 9), ("Chest pain follow-up", 11), ("Blood pressure review", 14)];
    for (reason, hour) in requests {
        let Some(at) = parse_when(&tomorrow.format(&format!("%Y-%m-%d {hour:02}:00")).to_string()) else {
            continue;
        };
        portal.start_booking();
        if let Err(e) = portal.composer.select_specialty(&patient, "Cardiology").await {
            println!("Could not load doctors: {}", e);
            return;
        }
        if let Err(e) = portal.composer.select_doctor("D1") {
            println!("{}", e);
            return;
        }
        portal.composer.set_schedule(at);
        portal.composer.set_description(reason);
        match portal.submit_booking(&patient).await {
            Ok(created) => println!("  Patient requested {} at {}", reason, format_when(created.scheduled_at())),
            Err(e) => println!("  Request '{}' failed: {}", reason, e),
        }
    }

    let schedule = ScheduleManager::new(store);
    if let Err(e) = schedule.load(&doctor).await {
        println!("Could not load schedule: {}", e);
        return;
    }
    let Ok(appointments) = schedule.appointments() else { return };
    let plan: Vec<(&str, TransitionAction)> = appointments
        .iter()
        .zip([TransitionAction::Approve, TransitionAction::Decline, TransitionAction::Approve])
        .map(|(apt, action)| (apt.id(), action))
        .collect();

    let result = schedule.apply_batch(&doctor, &plan).await;
    println!("\nDoctor triage: {:.1}% of changes applied", result.success_rate());

    if let Some(first) = appointments.first() {
        match schedule.set_status(&doctor, first.id(), AppointmentStatus::Completed).await {
            Ok(updated) => println!("  First visit marked {}", updated.status()),
            Err(e) => println!("  Could not complete first visit: {}", e),
        }
        // Completed is terminal; a second approval is refused by the store
        if let Err(e) = schedule.set_status(&doctor, first.id(), AppointmentStatus::Approved).await {
            println!("  Re-approval refused: {}", e);
        }
    }

    if let Ok(summary) = schedule.summary() {
        println!(
            "  Schedule: {} total, {} pending, {} approved",
            summary.total, summary.pending, summary.approved
        );
    }

    if portal.bookings.refresh(&patient).await.is_ok() {
        println!("\nPatient view after refresh:");
        for (i, apt) in portal.bookings.bookings().iter().enumerate() {
            print_appointment_line(i, apt);
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(io::stderr)
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = match PortalConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    match &config.api_url {
        Some(url) => match HttpStore::new(url, config.timeout_secs) {
            Ok(store) => {
                tracing::info!(api_url = %store.base_url(), "Using portal backend");
                PortalCli::new(Arc::new(store), false).run().await;
            }
            Err(e) => {
                eprintln!("Cannot reach portal backend: {}", e);
                std::process::exit(2);
            }
        },
        None => {
            let store = MemoryStore::demo();
            tracing::info!("No backend configured, using {}", store);
            PortalCli::new(Arc::new(store), true).run().await;
        }
    }
}
