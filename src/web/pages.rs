//! Minimal server-rendered HTML pages.

use crate::db::{UserRole, UserSummary};
use crate::lookup::NumberInfo;

/// Escape text for use in HTML content and attribute values.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
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

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{} - MSISDN Lookup</title>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        escape_html(title),
        body
    )
}

fn error_block(error: Option<&str>) -> String {
    match error {
        Some(message) => format!("<p class=\"error\">{}</p>", escape_html(message)),
        None => String::new(),
    }
}

pub fn home(role: Option<UserRole>) -> String {
    let links = match role {
        Some(UserRole::Admin) => {
            "<p>Signed in as admin.</p>\n<a href=\"/service/lookup\">Number lookup</a> | <a href=\"/admin/panel\">Admin panel</a> | <a href=\"/logout\">Log out</a>"
        }
        Some(UserRole::User) => {
            "<p>Signed in.</p>\n<a href=\"/service/lookup\">Number lookup</a> | <a href=\"/logout\">Log out</a>"
        }
        None => "<a href=\"/login\">Log in</a> | <a href=\"/register\">Register</a>",
    };
    layout("Home", &format!("<h1>MSISDN Lookup</h1>\n{}", links))
}

/// Login form. `redirect` is carried through a hidden field.
pub fn login(error: Option<&str>, email: &str, redirect: Option<&str>) -> String {
    let redirect_field = match redirect {
        Some(target) => format!(
            "<input type=\"hidden\" name=\"redirect\" value=\"{}\">",
            escape_html(target)
        ),
        None => String::new(),
    };
    layout(
        "Log in",
        &format!(
            "<h1>Log in</h1>\n{}\n<form method=\"post\" action=\"/login\">\n{}\n<label>Email <input type=\"email\" name=\"email\" value=\"{}\" required></label>\n<label>Password <input type=\"password\" name=\"password\" required></label>\n<button type=\"submit\">Log in</button>\n</form>\n<p><a href=\"/register\">Create an account</a></p>",
            error_block(error),
            redirect_field,
            escape_html(email)
        ),
    )
}

pub fn register(error: Option<&str>, email: &str) -> String {
    layout(
        "Register",
        &format!(
            "<h1>Register</h1>\n{}\n<form method=\"post\" action=\"/register\">\n<label>Email <input type=\"email\" name=\"email\" value=\"{}\" required></label>\n<label>Password <input type=\"password\" name=\"password\" required></label>\n<p>At least 8 characters with an uppercase letter, a lowercase letter, a digit and a special character.</p>\n<button type=\"submit\">Register</button>\n</form>\n<p><a href=\"/login\">Already registered?</a></p>",
            error_block(error),
            escape_html(email)
        ),
    )
}

pub fn lookup(msisdn: &str, result: Option<&NumberInfo>, error: Option<&str>) -> String {
    let result_block = match result {
        Some(info) => format!(
            "<table>\n<tr><th>Operator</th><td>{}</td></tr>\n<tr><th>Country code</th><td>{}</td></tr>\n<tr><th>Subscriber number</th><td>{}</td></tr>\n<tr><th>Country</th><td>{}</td></tr>\n</table>",
            escape_html(&info.mno),
            escape_html(&info.country_code),
            escape_html(&info.subscriber_number),
            escape_html(&info.country_identifier)
        ),
        None => String::new(),
    };
    layout(
        "Number lookup",
        &format!(
            "<h1>Number lookup</h1>\n{}\n<form method=\"post\" action=\"/service/lookup\">\n<label>MSISDN <input type=\"text\" name=\"msisdn\" value=\"{}\" required></label>\n<button type=\"submit\">Look up</button>\n</form>\n{}\n<p><a href=\"/logout\">Log out</a></p>",
            error_block(error),
            escape_html(msisdn),
            result_block
        ),
    )
}

pub fn admin_panel(users: &[UserSummary]) -> String {
    let rows: String = users
        .iter()
        .map(|user| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                escape_html(&user.id),
                escape_html(&user.username),
                user.role,
                if user.external { "external" } else { "password" },
                escape_html(&user.created_at)
            )
        })
        .collect();
    layout(
        "Admin panel",
        &format!(
            "<h1>Users</h1>\n<table>\n<tr><th>Id</th><th>Email</th><th>Role</th><th>Sign-in</th><th>Created</th></tr>\n{}</table>\n<p><a href=\"/service/lookup\">Number lookup</a> | <a href=\"/logout\">Log out</a></p>",
            rows
        ),
    )
}

pub fn internal_error() -> String {
    layout(
        "Error",
        "<h1>Something went wrong</h1>\n<p>Internal error, please try again.</p>\n<p><a href=\"/\">Home</a></p>",
    )
}
