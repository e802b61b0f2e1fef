//! Server-rendered pages
//!
//! Every page shares one layout: a sidebar holding login/logout and a main
//! column. Text is escaped here and nowhere else.

use crate::capture::Label;

const STYLE: &str = r#"
body { margin: 0; font-family: sans-serif; display: flex; min-height: 100vh; }
aside { width: 16rem; padding: 1.5rem; background: #f0f2f6; }
main { flex: 1; padding: 2rem 3rem; max-width: 52rem; }
.unit-text { white-space: pre-wrap; border: 1px solid #ccc; border-radius: 4px; padding: 1rem; line-height: 1.6; }
.error { color: #b00020; }
.label-btn { margin: 0.5rem 0.5rem 0.5rem 0; }
.progress { color: #555; }
.guide h2 { font-size: 1.2rem; }
textarea { width: 100%; min-height: 4rem; }
"#;

const HOW_TO_STEPS: [&str; 3] = [
    "Markér de udsagn, der bør faktatjekkes, dvs. udsagn som den generelle offentlighed kunne \
     have interesse i at få verificeret.",
    "Vælg en kategori for hver markering. Brug \"Andet\" til udsagn, der ikke passer i de andre \
     kategorier.",
    "Tryk til sidst på \"Gem annotation\" i bunden af siden for at gemme dine markeringer og gå \
     videre til næste debat.",
];

const ASK_YOURSELF: &str =
    "\"Vil den brede offentlighed være interesseret i at vide, om sætningen er sand eller falsk?\"";

const CHECK_WORTHY_EXAMPLES: [&str; 5] = [
    "Udsagn, der præsenteres som fakta, og som kan verificeres med data eller ekspertkilder.",
    "Kvantitative påstande (\"Danmark har det højeste skattetryk i Europa.\").",
    "Historiske påstande (\"Den tidligere regering skar 20% af sundhedsbudgettet.\").",
    "Påstande om lovgivning eller internationale aftaler (\"EU kræver, at vi reducerer CO2 med \
     50% inden 2030.\").",
    "Referencer til videnskabelige undersøgelser (\"Forskning viser, at elbiler er 70% mere \
     bæredygtige end dieselbiler.\").",
];

const NOT_CHECK_WORTHY_EXAMPLES: [&str; 3] = [
    "Personlige holdninger og værdiladede udsagn (\"Jeg synes, vi har den bedste klimapolitik.\").",
    "Spekulationer og hypotetiske scenarier (\"Hvis vi ikke handler nu, vil økonomien kollapse.\").",
    "Meget vage eller generelle udsagn (\"Vi gør det bedre end før.\").",
];

const TIPS: [&str; 2] = [
    "Hvis du fortryder en markering, kan du fjerne den med ✕ ud for den under \"Dine annotationer\".",
    "Hvis du vil have en pause, kan du logge ud med knappen til venstre og vende tilbage senere \
     og starte, hvor du slap.",
];

/// Escape text for HTML element content and quoted attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn list_items(items: &[&str]) -> String {
    items
        .iter()
        .map(|item| format!("<li>{}</li>", escape_html(item)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Guidance shown above the annotation widget
fn instructions() -> String {
    format!(
        r#"<section class="guide">
<h2>Sådan bruges siden</h2>
<ol>
{steps}
</ol>
<h2>🔍 Hvordan ved jeg, hvad der bør faktatjekkes?</h2>
<p><strong>Spørg dig selv:</strong> <em>{ask}</em></p>
<p>👉 <strong>Bør faktatjekkes:</strong></p>
<ul>
{worthy}
</ul>
<p>🚫 <strong>Bør ikke faktatjekkes:</strong></p>
<ul>
{not_worthy}
</ul>
<p><strong>⚡️ Tips ⚡️</strong></p>
<ul>
{tips}
</ul>
</section>"#,
        steps = list_items(&HOW_TO_STEPS),
        ask = escape_html(ASK_YOURSELF),
        worthy = list_items(&CHECK_WORTHY_EXAMPLES),
        not_worthy = list_items(&NOT_CHECK_WORTHY_EXAMPLES),
        tips = list_items(&TIPS),
    )
}

fn layout(title: &str, sidebar: &str, main: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="da">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>{STYLE}</style>
</head>
<body>
<aside>
{sidebar}
</aside>
<main>
{main}
</main>
</body>
</html>
"#,
        title = escape_html(title),
    )
}

fn logout_form(user_id: &str) -> String {
    format!(
        r#"<p>Logget ind som <strong>{}</strong></p>
<form method="post" action="/logout">
<button type="submit">Log ud</button>
</form>"#,
        escape_html(user_id)
    )
}

/// Login form, optionally with an inline error
pub fn render_login(error: Option<&str>) -> String {
    let error_html = error
        .map(|msg| format!(r#"<p class="error">{}</p>"#, escape_html(msg)))
        .unwrap_or_default();

    let sidebar = format!(
        r#"<form method="post" action="/login">
<label for="user_id">Bruger-ID</label><br>
<input id="user_id" name="user_id" type="text" autocomplete="off" autofocus>
<button type="submit">Log ind</button>
</form>
{error_html}"#
    );
    let main = "<h1>Annotering af faktatjekbare udsagn</h1>\n\
<p>Indtast dit bruger-ID ude til venstre for at begynde at annotere.</p>";

    layout("Log ind", &sidebar, main)
}

/// What the annotation page shows for the current unit
#[derive(Debug)]
pub struct AnnotationView<'a> {
    pub user_id: &'a str,
    pub index: usize,
    pub total: usize,
    pub display_text: &'a str,
    pub comment: &'a str,
    pub error: Option<&'a str>,
}

/// Annotation page: text, label buttons, selection summary and submit form
pub fn render_annotation(view: &AnnotationView<'_>) -> String {
    let error_html = view
        .error
        .map(|msg| format!(r#"<p class="error">{}</p>"#, escape_html(msg)))
        .unwrap_or_default();

    let label_buttons: String = Label::ALL
        .iter()
        .map(|label| {
            let name = escape_html(label.name());
            format!(r#"<button type="button" class="label-btn" data-label="{name}">{name}</button>"#)
        })
        .collect::<Vec<_>>()
        .join("\n");

    let main = format!(
        r#"<h1>Annotering af faktatjekbare udsagn</h1>
<p class="progress">Tekst {position} af {total}</p>
{instructions}
{error_html}
<div id="unit-text" class="unit-text">{text}</div>
<div>
{label_buttons}
</div>
<h2>Dine annotationer</h2>
<ul id="selection-summary"></ul>
<form id="annotation-form" method="post" action="/annotate">
<input type="hidden" name="text_index" value="{index}">
<input type="hidden" id="spans-input" name="spans" value="">
<label for="comment">Kommentar (valgfri)</label>
<textarea id="comment" name="comment">{comment}</textarea>
<button id="submit-btn" type="submit" disabled>Gem annotation</button>
</form>
<script src="/static/annotate.js"></script>"#,
        position = view.index + 1,
        total = view.total,
        instructions = instructions(),
        text = escape_html(view.display_text),
        index = view.index,
        comment = escape_html(view.comment),
    );

    layout("Annotering", &logout_form(view.user_id), &main)
}

/// Completion banner
pub fn render_finished(user_id: &str) -> String {
    let main = "<h1>Annotering af faktatjekbare udsagn</h1>\n\
<p>🎉 Du har annoteret alle tekster!</p>\n\
<p>✅ Du kan nu logge ud via knappen i sidebaren.</p>";
    layout("Færdig", &logout_form(user_id), main)
}

/// Full-page error; the only way forward is back to the start page
pub fn render_error(title: &str, detail: &str) -> String {
    let main = format!(
        r#"<h1>❌ {}</h1>
<p class="error">{}</p>
<p><a href="/">Tilbage</a></p>"#,
        escape_html(title),
        escape_html(detail)
    );
    layout(title, "", &main)
}
