//! Menu Tree
//!
//! Data-driven menu table and the rendering of menu prompts and the fixed
//! informational replies. Adding a menu or an action means extending the
//! table, not adding dispatch branches.

use super::session::MenuState;
use super::{Reply, StoreProfile};

/// Fixed informational responders reachable from the main menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoAction {
    Location,
    Hours,
    Contact,
    Catalog,
}

/// What selecting a menu option does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    /// Move the session into another menu and emit its prompt.
    Navigate(MenuState),
    /// Emit a fixed informational reply without touching session state.
    Inform(InfoAction),
}

/// One row of a menu's option table.
#[derive(Debug, Clone, Copy)]
pub struct MenuOption {
    pub key: char,
    pub label: &'static str,
    pub action: MenuAction,
}

/// The main menu. Closed set; commands are matched uppercased.
pub const MAIN_MENU: &[MenuOption] = &[
    MenuOption {
        key: 'A',
        label: "🔥 Descubre ofertas con IA",
        action: MenuAction::Navigate(MenuState::Searching),
    },
    MenuOption {
        key: 'B',
        label: "📍 ¿Dónde estamos?",
        action: MenuAction::Inform(InfoAction::Location),
    },
    MenuOption {
        key: 'C',
        label: "🕒 Horarios de atención",
        action: MenuAction::Inform(InfoAction::Hours),
    },
    MenuOption {
        key: 'D',
        label: "📞 Contáctanos",
        action: MenuAction::Inform(InfoAction::Contact),
    },
    MenuOption {
        key: 'E',
        label: "📄 Catálogo en PDF",
        action: MenuAction::Inform(InfoAction::Catalog),
    },
];

/// Commands that reset the session from any state.
pub const RESET_KEYWORDS: &[&str] = &["MENU", "MENÚ", "SALIR", "CANCELAR"];

pub const INVALID_OPTION: &str =
    "❌ Opción no válida.\nEscribe *MENU* para ver las opciones disponibles.";

pub const SEARCH_PROMPT: &str = "🔍 *¿Qué producto estás buscando?*\n\n\
Puedes escribir:\n\
• Celular Samsung\n\
• Laptop gamer hasta 800$\n\
• TV 55 pulgadas\n\n\
🛒 *Comandos especiales:*\n\
• `agregar 3` → añade el producto #3\n\
• `agregar 2, cantidad 5` → cantidad personalizada\n\
• `finalizar` → completar pedido\n\
• `menu` → volver al inicio";

/// Look up a main-menu option by its (already uppercased) command.
pub fn find_option(command: &str) -> Option<&'static MenuOption> {
    let mut chars = command.chars();
    let key = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    MAIN_MENU.iter().find(|opt| opt.key == key)
}

/// Render the prompt for a menu state.
pub fn prompt_for(menu: MenuState, profile: &StoreProfile, sender_name: &str) -> String {
    match menu {
        MenuState::Main => render_main_menu(profile, sender_name),
        MenuState::Searching => SEARCH_PROMPT.to_string(),
    }
}

/// Greeting plus the option table, one line per entry.
pub fn render_main_menu(profile: &StoreProfile, sender_name: &str) -> String {
    let store = profile.name.as_deref().unwrap_or("Nuestra Tienda");
    let mut text = format!(
        "¡Hola {sender_name}! 👋\nBienvenido a *{store}*.\n\n¿Qué necesitas hoy?\n\n"
    );
    for opt in MAIN_MENU {
        text.push_str(&format!("*{}* {}\n", opt.key, opt.label));
    }
    text.push_str("\n_Escribe solo la letra_");
    text
}

/// Render a fixed informational action from the store profile.
pub fn render_info(action: InfoAction, profile: &StoreProfile) -> Reply {
    match action {
        InfoAction::Location => Reply::Text(format!(
            "📍 *Nuestra Ubicación*\n\n{}\n\n🗺️ Ver en Maps:\n{}",
            profile.address.as_deref().unwrap_or("No disponible"),
            profile.maps_link.as_deref().unwrap_or("Link no disponible"),
        )),
        InfoAction::Hours => Reply::Text(format!(
            "⏰ *Horarios de Atención*\n\n{}\n\n¡Te esperamos!",
            profile
                .hours
                .as_deref()
                .unwrap_or("Lun-Vie 9:00-18:00 | Sáb 9:00-13:00"),
        )),
        InfoAction::Contact => Reply::Text(format!(
            "📞 *Información de Contacto*\n\n📱 WhatsApp: {}\n📧 Email: {}\n🌐 Web: {}",
            profile.whatsapp.as_deref().unwrap_or("Este número"),
            profile.email.as_deref().unwrap_or("No disponible"),
            profile.website.as_deref().unwrap_or("No disponible"),
        )),
        InfoAction::Catalog => match profile.catalog_url.as_deref() {
            Some(url) => Reply::Document {
                url: url.to_string(),
                file_name: profile
                    .catalog_name
                    .clone()
                    .unwrap_or_else(|| "Catálogo.pdf".to_string()),
                caption: "📄 Aquí tienes nuestro catálogo completo en PDF.\n\
                          ¡Explora nuestros productos!"
                    .to_string(),
            },
            None => Reply::Text("❌ El catálogo no está disponible en este momento.".to_string()),
        },
    }
}
