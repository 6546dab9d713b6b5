use std::fmt;
use std::sync::Arc;

use fake::Fake;
use rand::{Rng, RngCore};
use serde_json::Value;

use fakeit_core::Capability;

use super::{Generator, GeneratorRegistry, bound};
use crate::errors::GenerationError;
use crate::params::{ParamKind, ParamSpec, validate_params};

const FAKER_PARAMS: &[ParamSpec] = &[ParamSpec::new("locale", ParamKind::String, false)];
const SENTENCE_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("locale", ParamKind::String, false),
    ParamSpec::new("min_words", ParamKind::Int, false),
    ParamSpec::new("max_words", ParamKind::Int, false),
];

/// Faker ids that take no params besides `locale`.
const FAKER_IDS: &[&str] = &[
    "faker.name.first_name",
    "faker.name.last_name",
    "faker.name.full_name",
    "faker.internet.email",
    "faker.internet.username",
    "faker.address.city",
    "faker.address.street",
    "faker.address.zip",
    "faker.address.country",
    "faker.company.name",
    "faker.company.industry",
    "faker.phone.number",
    "faker.lorem.word",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Locale {
    En,
    PtBr,
}

impl Locale {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "en" | "en_US" => Some(Self::En),
            "pt_br" | "pt_BR" => Some(Self::PtBr),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::PtBr => "pt_br",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(super) fn register(registry: &mut GeneratorRegistry) {
    for &id in FAKER_IDS {
        registry.register_generator(Box::new(FakerGenerator { id }));
    }
    registry.register_generator(Box::new(SentenceGenerator));
}

struct FakerGenerator {
    id: &'static str,
}

impl Generator for FakerGenerator {
    fn id(&self) -> &'static str {
        self.id
    }

    fn bind(&self, params: Option<&Value>) -> Result<Arc<dyn Capability>, GenerationError> {
        let params = validate_params(params, FAKER_PARAMS, self.id)?;
        let locale = parse_locale(self.id, params.get_str("locale"))?;
        let id = self.id;
        Ok(bound(id, move |ctx| {
            Ok(Value::String(faker_value(id, locale, ctx.rng())))
        }))
    }
}

struct SentenceGenerator;

impl Generator for SentenceGenerator {
    fn id(&self) -> &'static str {
        "faker.lorem.sentence"
    }

    fn bind(&self, params: Option<&Value>) -> Result<Arc<dyn Capability>, GenerationError> {
        let params = validate_params(params, SENTENCE_PARAMS, self.id())?;
        let locale = parse_locale(self.id(), params.get_str("locale"))?;
        let min_words = params.get_i64("min_words").unwrap_or(4);
        let max_words = params.get_i64("max_words").unwrap_or(10);
        if min_words < 1 || min_words > max_words {
            return Err(GenerationError::InvalidModel(format!(
                "{}: min_words must be >= 1 and <= max_words",
                self.id()
            )));
        }
        let (min_words, max_words) = (min_words as usize, max_words as usize);
        Ok(bound(self.id(), move |ctx| {
            let rng = ctx.rng();
            let words = rng.random_range(min_words..=max_words);
            let value: String = match locale {
                Locale::En => fake::faker::lorem::en::Sentence(words..words + 1).fake_with_rng(rng),
                Locale::PtBr => {
                    fake::faker::lorem::pt_br::Sentence(words..words + 1).fake_with_rng(rng)
                }
            };
            Ok(Value::String(value))
        }))
    }
}

fn parse_locale(id: &str, locale: Option<&str>) -> Result<Locale, GenerationError> {
    let locale = locale.unwrap_or("en");
    Locale::parse(locale).ok_or_else(|| {
        GenerationError::InvalidModel(format!("{id}: unsupported faker locale '{locale}'"))
    })
}

fn faker_value(id: &str, locale: Locale, rng: &mut dyn RngCore) -> String {
    use fake::faker::{address, company, internet, lorem, name, phone_number};

    match (id, locale) {
        ("faker.name.first_name", Locale::En) => name::en::FirstName().fake_with_rng(rng),
        ("faker.name.first_name", Locale::PtBr) => name::pt_br::FirstName().fake_with_rng(rng),
        ("faker.name.last_name", Locale::En) => name::en::LastName().fake_with_rng(rng),
        ("faker.name.last_name", Locale::PtBr) => name::pt_br::LastName().fake_with_rng(rng),
        ("faker.name.full_name", Locale::En) => name::en::Name().fake_with_rng(rng),
        ("faker.name.full_name", Locale::PtBr) => name::pt_br::Name().fake_with_rng(rng),
        ("faker.internet.email", Locale::En) => internet::en::SafeEmail().fake_with_rng(rng),
        ("faker.internet.email", Locale::PtBr) => internet::pt_br::SafeEmail().fake_with_rng(rng),
        ("faker.internet.username", Locale::En) => internet::en::Username().fake_with_rng(rng),
        ("faker.internet.username", Locale::PtBr) => {
            internet::pt_br::Username().fake_with_rng(rng)
        }
        ("faker.address.city", Locale::En) => address::en::CityName().fake_with_rng(rng),
        ("faker.address.city", Locale::PtBr) => address::pt_br::CityName().fake_with_rng(rng),
        ("faker.address.street", Locale::En) => address::en::StreetName().fake_with_rng(rng),
        ("faker.address.street", Locale::PtBr) => address::pt_br::StreetName().fake_with_rng(rng),
        ("faker.address.zip", Locale::En) => address::en::ZipCode().fake_with_rng(rng),
        ("faker.address.zip", Locale::PtBr) => address::pt_br::ZipCode().fake_with_rng(rng),
        ("faker.address.country", Locale::En) => address::en::CountryName().fake_with_rng(rng),
        ("faker.address.country", Locale::PtBr) => {
            address::pt_br::CountryName().fake_with_rng(rng)
        }
        ("faker.company.name", Locale::En) => company::en::CompanyName().fake_with_rng(rng),
        ("faker.company.name", Locale::PtBr) => company::pt_br::CompanyName().fake_with_rng(rng),
        ("faker.company.industry", Locale::En) => company::en::Industry().fake_with_rng(rng),
        ("faker.company.industry", Locale::PtBr) => company::pt_br::Industry().fake_with_rng(rng),
        ("faker.phone.number", Locale::En) => phone_number::en::PhoneNumber().fake_with_rng(rng),
        ("faker.phone.number", Locale::PtBr) => {
            phone_number::pt_br::PhoneNumber().fake_with_rng(rng)
        }
        (_, Locale::En) => lorem::en::Word().fake_with_rng(rng),
        (_, Locale::PtBr) => lorem::pt_br::Word().fake_with_rng(rng),
    }
}
