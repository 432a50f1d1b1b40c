//! Chat reply templates
//!
//! Everything the bot says is rendered here. Functions are pure and take
//! only the data they print.

use crate::db::Listing;
use crate::state_machine::MenuType;

/// Number of canned greetings; selection is keyed by a stable hash of the user id.
pub const GREETING_COUNT: usize = 4;

const TITLE_PREVIEW_CHARS: usize = 30;
const DESCRIPTION_PREVIEW_CHARS: usize = 200;
const ID_PREVIEW_CHARS: usize = 8;

const MAIN_MENU: &str = "🏠 *INSPEKTA PROPERTY SEARCH*

Welcome! How would you like to search for properties?

*Quick Search:*
1️⃣ Show all available properties
2️⃣ Properties under ₦50M
3️⃣ Properties in Lagos
4️⃣ Properties in Abuja

*Detailed Search:*
5️⃣ Search by property type
6️⃣ Search by number of bedrooms
7️⃣ Search by price range
8️⃣ Search by location

*Or simply type your request:*
💬 \"Show me 3 bedroom apartments in Lagos\"
💬 \"Houses under 40 million naira\"
💬 \"Office spaces in Abuja\"

Reply with a number (1-8) or type your search request.";

const PROPERTY_TYPE_MENU: &str = "🏢 *SELECT PROPERTY TYPE*

1️⃣ Apartments/Flats
2️⃣ Houses/Duplexes
3️⃣ Office Spaces
4️⃣ All types

0️⃣ Back to main menu

Reply with your choice (1-4):";

const BEDROOM_MENU: &str = "🛏️ *SELECT NUMBER OF BEDROOMS*

1️⃣ 1 Bedroom
2️⃣ 2 Bedrooms
3️⃣ 3 Bedrooms
4️⃣ 4 Bedrooms
5️⃣ 5 Bedrooms
6️⃣ Any number

0️⃣ Back to main menu

Reply with your choice (1-6):";

const PRICE_MENU: &str = "💰 *SELECT PRICE RANGE*

1️⃣ Under ₦25M
2️⃣ ₦25M - ₦50M
3️⃣ ₦50M - ₦100M
4️⃣ ₦100M - ₦200M
5️⃣ Above ₦200M
6️⃣ Any price

0️⃣ Back to main menu

Reply with your choice (1-6):";

const LOCATION_MENU: &str = "📍 *SELECT LOCATION*

1️⃣ Lagos
2️⃣ Abuja
3️⃣ Port Harcourt
4️⃣ Kano
5️⃣ Ibadan
6️⃣ All locations

0️⃣ Back to main menu

Reply with your choice (1-6):";

#[allow(dead_code)] // Used in tests
pub fn main_menu() -> &'static str {
    MAIN_MENU
}

pub fn sub_menu(menu_type: MenuType) -> &'static str {
    match menu_type {
        MenuType::PropertyType => PROPERTY_TYPE_MENU,
        MenuType::Bedrooms => BEDROOM_MENU,
        MenuType::Price => PRICE_MENU,
        MenuType::Location => LOCATION_MENU,
    }
}

/// Sub-menu shown right after it was picked from the main menu
pub fn sub_menu_intro(menu_type: MenuType) -> String {
    let label = match menu_type {
        MenuType::PropertyType => "Search by property type",
        MenuType::Bedrooms => "Search by number of bedrooms",
        MenuType::Price => "Search by price range",
        MenuType::Location => "Search by location",
    };
    format!("✅ You selected: *{label}*\n\n{}", sub_menu(menu_type))
}

pub fn welcome_back(name: &str) -> String {
    format!("👋 Welcome back {}!\n\n{MAIN_MENU}", display_name(name))
}

pub fn greeting(name: &str, index: usize) -> String {
    let name = display_name(name);
    let line = match index % GREETING_COUNT {
        0 => format!("👋 Hi there, {name}! Welcome to INSPEKTA Property Search!"),
        1 => format!("🏠 Hello {name}! Ready to find your perfect property?"),
        2 => format!("👋 Hey {name}! Let's find you an amazing property today!"),
        _ => format!("🌟 Hi {name}! Welcome back to INSPEKTA Property Search!"),
    };
    format!("{line}\n\n{MAIN_MENU}")
}

pub fn no_previous_step() -> String {
    format!("🔄 No previous step. Returning to main menu...\n\n{MAIN_MENU}")
}

pub fn back_to_main() -> String {
    format!("🔙 Returning to main menu...\n\n{MAIN_MENU}")
}

pub fn session_ended() -> &'static str {
    "👋 Thanks for using INSPEKTA Property Search! Your session has ended.\n\n\
     Send any message to start a new search."
}

pub fn apology() -> &'static str {
    "❌ Sorry, I encountered an error processing your request.\n\n\
     Reply *menu* to see search options."
}

pub fn no_results(description: &str) -> String {
    format!(
        "❌ No properties found for: *{description}*\n\n\
         Let me show you our main search options:\n\n{MAIN_MENU}"
    )
}

/// Numbered result list
pub fn search_results(description: &str, listings: &[Listing]) -> String {
    let mut message = format!(
        "🔍 *SEARCH RESULTS* for: *{description}*\n\nFound {} properties:\n\n",
        listings.len()
    );

    for (i, listing) in listings.iter().enumerate() {
        message.push_str(&format!(
            "*{}. {}*\n📍 {}, {}\n💰 {} | 🛏️ {}BR | 🏢 {}\n🆔 {}...\n\n",
            i + 1,
            preview(&listing.title, TITLE_PREVIEW_CHARS),
            listing.city,
            listing.state,
            format_price(listing.price),
            listing.bedrooms,
            title_case(&listing.property_type),
            head(&listing.id, ID_PREVIEW_CHARS),
        ));
    }

    message.push_str(&format!(
        "📱 *Select a property by typing its number (1-{})*\n\
         💡 Type *back* to go back | Type *menu* for main menu",
        listings.len()
    ));
    message
}

/// Full listing card followed by the detail actions
pub fn property_detail(listing: &Listing) -> String {
    format!(
        "{}\n\n🎯 *What would you like to do?*\n\
         1️⃣ Show interest in this property\n\
         2️⃣ Schedule an inspection\n\n\
         💡 Type *back* to return to search results | Type *menu* for main menu",
        listing_card(listing)
    )
}

pub fn listing_card(listing: &Listing) -> String {
    let area = listing
        .area
        .map_or_else(|| "Area not specified".to_string(), |a| format!("{a}sqm"));
    let rooms = if listing.bedrooms > 0 {
        format!("{}BR/{}BA", listing.bedrooms, listing.bathrooms)
    } else {
        "Rooms not specified".to_string()
    };
    let description = listing
        .description
        .as_deref()
        .filter(|d| !d.is_empty())
        .map_or_else(
            || "No description available".to_string(),
            |d| preview(d, DESCRIPTION_PREVIEW_CHARS),
        );

    format!(
        "🏠 *{}*\n\n\
         📍 *Location:* {}, {}, {}\n\n\
         💰 *Price:* {}\n\
         🏢 *Type:* {}\n\
         🛏️ *Rooms:* {rooms}\n\
         📐 *Area:* {area}\n\n\
         📝 *Description:*\n{description}\n\n\
         🆔 *Property ID:* {}...",
        listing.title,
        listing.address,
        listing.city,
        listing.state,
        format_price(listing.price),
        title_case(&listing.property_type),
        head(&listing.id, ID_PREVIEW_CHARS),
    )
}

pub fn interest_recorded() -> &'static str {
    "✅ *Interest Recorded!*\n\n\
     Thank you for showing interest in this property. This feature is being developed.\n\n\
     🔄 Coming soon:\n\
     • Direct contact with agent\n• Save to favorites\n• Request more information\n\n\
     💡 Type *back* to return to search results | Type *menu* for main menu"
}

pub fn inspection_requested() -> &'static str {
    "📅 *Schedule Inspection*\n\n\
     Scheduling feature is being developed.\n\n\
     🔄 Coming soon:\n\
     • Available time slots\n• Calendar integration\n\
     • Agent coordination\n• Reminder notifications\n\n\
     💡 Type *back* to return to search results | Type *menu* for main menu"
}

// ============================================================
// Rejection templates
// ============================================================
//
// Each one echoes the input, names the accepted range, and lists the
// escape commands that apply in that context.

pub fn main_menu_rejection(input: &str) -> String {
    format!(
        "❌ Unrecognized input: \"{input}\"\n\n\
         Please select a number (1-8) from the menu or try natural language like:\n\
         • \"3 bedroom apartments in Lagos\"\n\
         • \"Properties under 50 million\"\n\n\
         💡 Type *menu* to return to main menu\n\n{MAIN_MENU}"
    )
}

pub fn results_rejection(input: &str, result_count: usize) -> String {
    format!(
        "❌ Unrecognized input: \"{input}\"\n\n\
         Please select a property by typing a number (1-{result_count})\n\n\
         💡 *Available commands:*\n• Type *back* to go back\n• Type *menu* for main menu"
    )
}

pub fn detail_rejection(input: &str) -> String {
    format!(
        "❌ Unrecognized input: \"{input}\"\n\n\
         Please select an option (1-2):\n1️⃣ Show interest\n2️⃣ Schedule inspection\n\n\
         💡 Type *back* to return to search results | Type *menu* for main menu"
    )
}

pub fn sub_menu_rejection(input: &str, menu_type: MenuType) -> String {
    format!(
        "❌ Unrecognized input: \"{input}\"\n\n\
         Please select 1-{} or 0 to go back.\n\n\
         💡 Type *back* to go back | Type *menu* for main menu",
        menu_type.option_count()
    )
}

// ============================================================
// Helpers
// ============================================================

/// `₦12.5M` from a million up, `₦950,000` below
pub fn format_price(price: f64) -> String {
    if price >= 1_000_000.0 {
        format!("₦{:.1}M", price / 1_000_000.0)
    } else {
        #[allow(clippy::cast_possible_truncation)]
        let whole = price.round() as i64;
        format!("₦{}", group_thousands(whole))
    }
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn display_name(name: &str) -> &str {
    let name = name.trim();
    if name.is_empty() {
        "there"
    } else {
        name
    }
}

/// First `max` characters, with an ellipsis when cut
fn preview(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        format!("{}...", head(text, max))
    } else {
        text.to_string()
    }
}

fn head(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// `APARTMENT` -> `Apartment`
fn title_case(text: &str) -> String {
    let lower = text.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
