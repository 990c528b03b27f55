//! Public holidays and school vacations published on everyone's calendar.
//!
//! These entries have no owner, so the authorization gate keeps them read-only for every
//! user. Ids are deterministic so the same holiday always has the same id.

use crate::booking::{Booking, BookingType};
use crate::calendar::ReferenceZone;
use crate::ids::ObjectId;
use chrono::NaiveDate;

struct SpecialDate {
    title: &'static str,
    booking_type: BookingType,
    start: (i32, u32, u32),
    end: (i32, u32, u32),
}

const fn holiday(title: &'static str, month: u32, day: u32) -> SpecialDate {
    SpecialDate {
        title,
        booking_type: BookingType::Holiday,
        start: (2026, month, day),
        end: (2026, month, day),
    }
}

const CALENDAR_2026: &[SpecialDate] = &[
    holiday("Año Nuevo", 1, 1),
    SpecialDate {
        title: "Carnaval",
        booking_type: BookingType::Holiday,
        start: (2026, 2, 16),
        end: (2026, 2, 17),
    },
    holiday("Día Nacional de la Memoria por la Verdad y la Justicia", 3, 24),
    holiday("Día del Veterano y de los Caídos en la Guerra de Malvinas", 4, 2),
    holiday("Viernes Santo", 4, 3),
    holiday("Día del Trabajador", 5, 1),
    holiday("Día de la Revolución de Mayo", 5, 25),
    holiday("Paso a la inm. Gral. Güemes", 6, 17),
    holiday("Paso a la inm. del Gral. Belgrano", 6, 20),
    holiday("Día de la Independencia", 7, 9),
    holiday("Paso a la inm. del Gral San Martín", 8, 17),
    holiday("Día de la raza", 10, 12),
    holiday("Día de la Soberanía Nacional", 11, 20),
    holiday("Inmaculada Concepción de María", 12, 8),
    holiday("Navidad", 12, 25),
    SpecialDate {
        title: "Vacaciones de Verano",
        booking_type: BookingType::Vacation,
        start: (2025, 12, 20),
        end: (2026, 3, 8),
    },
    SpecialDate {
        title: "Vacaciones de Invierno",
        booking_type: BookingType::Vacation,
        start: (2026, 7, 14),
        end: (2026, 7, 30),
    },
];

/// System bookings for `year`, empty when no table exists for it.
pub fn for_year(year: i32, zone: &ReferenceZone) -> Vec<Booking> {
    let table = match year {
        2026 => CALENDAR_2026,
        _ => return Vec::new(),
    };

    table
        .iter()
        .enumerate()
        .filter_map(|(ordinal, entry)| {
            let start = date(entry.start)?;
            let end = date(entry.end)?;
            let start = zone.start_of_day(start);
            let seconds = u32::try_from(start.timestamp()).ok()?;
            Some(Booking {
                id: Some(ObjectId::from_parts(seconds, ordinal as u64)),
                title: entry.title.to_owned(),
                notes: None,
                booking_type: entry.booking_type,
                party_size: None,
                start,
                end: zone.start_of_day(end),
                owner: None,
            })
        })
        .collect()
}

fn date((y, m, d): (i32, u32, u32)) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}
