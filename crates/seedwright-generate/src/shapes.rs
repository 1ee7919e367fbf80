//! Semantic column shapes picked from column names.

use fake::Fake;
use fake::faker::address::en::{BuildingNumber, CityName, CountryName, StreetName, ZipCode};
use fake::faker::color::en::HexColor;
use fake::faker::company::en::CompanyName;
use fake::faker::internet::en::{DomainSuffix, IPv4, SafeEmail, Username};
use fake::faker::job::en::Title as JobTitle;
use fake::faker::lorem::en::{Sentence, Words};
use fake::faker::name::en::{FirstName, LastName, Name};
use fake::faker::phone_number::en::PhoneNumber;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use seedwright_core::ColumnKind;

use crate::values::random_uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Email,
    FirstName,
    LastName,
    FullName,
    Username,
    Phone,
    Url,
    City,
    Country,
    StreetAddress,
    PostalCode,
    Company,
    JobTitle,
    IpAddress,
    Color,
    Slug,
    Title,
    Description,
    PasswordHash,
    Uuid,
}

impl Shape {
    /// Shape for a text column, from its name. Non-text kinds have no shape.
    pub fn detect(column_name: &str, kind: &ColumnKind) -> Option<Shape> {
        if !matches!(kind, ColumnKind::Text { .. }) {
            return None;
        }
        let name = column_name.to_lowercase().replace(['-', ' '], "_");
        let name = name.as_str();

        let shape = match name {
            _ if name.contains("email") => Shape::Email,
            "first_name" | "firstname" | "given_name" => Shape::FirstName,
            "last_name" | "lastname" | "surname" | "family_name" => Shape::LastName,
            "name" | "full_name" | "fullname" | "display_name" | "author_name" => Shape::FullName,
            "username" | "user_name" | "login" | "handle" | "nickname" => Shape::Username,
            _ if name.contains("phone") || name.contains("mobile") => Shape::Phone,
            _ if name.ends_with("url") || name == "website" || name == "homepage" => Shape::Url,
            "city" | "town" => Shape::City,
            "country" | "country_name" => Shape::Country,
            "address" | "street" | "street_address" | "address_line1" | "address_line_1" => {
                Shape::StreetAddress
            }
            "zip" | "zipcode" | "zip_code" | "postal_code" | "postcode" => Shape::PostalCode,
            "company" | "company_name" | "organization" | "organisation" => Shape::Company,
            "job_title" | "position" | "occupation" => Shape::JobTitle,
            _ if name == "ip" || name.ends_with("_ip") || name.contains("ip_address") => {
                Shape::IpAddress
            }
            "color" | "colour" => Shape::Color,
            _ if name.ends_with("slug") => Shape::Slug,
            "title" | "headline" | "subject" => Shape::Title,
            "description" | "bio" | "summary" | "body" | "content" | "comment" | "notes" => {
                Shape::Description
            }
            _ if name.contains("password") => Shape::PasswordHash,
            _ if name.ends_with("uuid") || name.ends_with("guid") => Shape::Uuid,
            _ => return None,
        };
        Some(shape)
    }

    pub fn generate(self, rng: &mut ChaCha8Rng) -> String {
        match self {
            Shape::Email => SafeEmail().fake_with_rng(rng),
            Shape::FirstName => FirstName().fake_with_rng(rng),
            Shape::LastName => LastName().fake_with_rng(rng),
            Shape::FullName => Name().fake_with_rng(rng),
            Shape::Username => Username().fake_with_rng(rng),
            Shape::Phone => PhoneNumber().fake_with_rng(rng),
            Shape::Url => {
                let words: Vec<String> = Words(1..3).fake_with_rng(rng);
                let suffix: String = DomainSuffix().fake_with_rng(rng);
                format!("https://{}.{suffix}", slugify(&words.join(" ")))
            }
            Shape::City => CityName().fake_with_rng(rng),
            Shape::Country => CountryName().fake_with_rng(rng),
            Shape::StreetAddress => {
                let number: String = BuildingNumber().fake_with_rng(rng);
                let street: String = StreetName().fake_with_rng(rng);
                format!("{number} {street}")
            }
            Shape::PostalCode => ZipCode().fake_with_rng(rng),
            Shape::Company => CompanyName().fake_with_rng(rng),
            Shape::JobTitle => JobTitle().fake_with_rng(rng),
            Shape::IpAddress => IPv4().fake_with_rng(rng),
            Shape::Color => HexColor().fake_with_rng(rng),
            Shape::Slug => {
                let words: Vec<String> = Words(2..4).fake_with_rng(rng);
                slugify(&words.join(" "))
            }
            Shape::Title => {
                let sentence: String = Sentence(3..7).fake_with_rng(rng);
                sentence.trim_end_matches('.').to_string()
            }
            Shape::Description => Sentence(6..16).fake_with_rng(rng),
            Shape::PasswordHash => {
                let bytes: [u8; 32] = rng.random();
                format!("$sha256${}", hex::encode(bytes))
            }
            Shape::Uuid => random_uuid(rng),
        }
    }

    /// Make a retried value distinct without changing its shape.
    pub fn disambiguate(self, value: &str, attempt: u32) -> String {
        match self {
            Shape::Email => match value.split_once('@') {
                Some((local, domain)) => format!("{local}+{attempt}@{domain}"),
                None => format!("{value}+{attempt}"),
            },
            Shape::Username | Shape::Slug => format!("{value}-{attempt}"),
            _ => value.to_string(),
        }
    }
}

fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut dash = false;
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            dash = false;
        } else if !dash && !slug.is_empty() {
            slug.push('-');
            dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn text() -> ColumnKind {
        ColumnKind::Text { max_len: None }
    }

    #[test]
    fn detects_shapes_from_column_names() {
        assert_eq!(Shape::detect("email", &text()), Some(Shape::Email));
        assert_eq!(Shape::detect("contactEmail", &text()), Some(Shape::Email));
        assert_eq!(Shape::detect("first_name", &text()), Some(Shape::FirstName));
        assert_eq!(Shape::detect("avatar_url", &text()), Some(Shape::Url));
        assert_eq!(Shape::detect("slug", &text()), Some(Shape::Slug));
        assert_eq!(Shape::detect("email", &ColumnKind::Int), None);
        assert_eq!(Shape::detect("flavour", &text()), None);
    }

    #[test]
    fn email_retries_keep_the_domain() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let email = Shape::Email.generate(&mut rng);
        assert!(email.contains('@'));
        let retried = Shape::Email.disambiguate(&email, 3);
        assert!(retried.contains("+3@"));
    }

    #[test]
    fn color_columns_get_hex_colors() {
        assert_eq!(Shape::detect("colour", &text()), Some(Shape::Color));
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let color = Shape::Color.generate(&mut rng);
        assert!(color.starts_with('#'));
        assert!(color.len() > 1);
        assert!(color[1..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Hello,  World!"), "hello-world");
    }
}
