//! Fixed instruction templates sent to the completion service.
//!
//! Both templates take the raw message body and nothing else. Which one is
//! used is a configuration choice made once per process.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Placeholder replaced by the raw message body.
const INPUT_PLACEHOLDER: &str = "{text}";

/// Field names of every object in the structured output, in output order.
pub const STRUCTURED_FIELDS: [&str; 14] = [
    "Datum",
    "Dag",
    "Locatie",
    "Dagdeel",
    "Wind",
    "Wind richting",
    "Getij ",
    "Getij score",
    "Golf hoogte",
    "Clean",
    "Swell",
    "Periode",
    "Gaan Pro",
    "Gaan beginner",
];

const STRUCTURED_TEMPLATE: &str = r#"Je krijgt hieronder een informeel geschreven surfweerbericht in het Nederlands.
De tekst bevat afkortingen, spreektaal en losse zinnen, maar bevat belangrijke informatie
over surfcondities op specifieke locaties, dagen en dagdelen in Nederland en België.

Je taak: Zet deze informatie om naar een gestructureerde JSON-array met de opgegeven velden,
maar voordat je de JSON maakt, doorloop je eerst een bundelstap per locatie zodat informatie
op verschillende niveaus (regio ↔ specifieke spot) correct wordt gecombineerd.

Stap 1 — Uitspraken identificeren
- Splits de tekst in losse uitspraken die concrete gegevens bevatten over surfcondities
  (wind, tij, golfhoogte, clean, tijden, swell, etc.).
- Noteer bij elke uitspraak: Locatie(s), Dag, Dagdeel (indien genoemd), en de exacte parameters
  zoals in de tekst.
- Behoud de tekst exact zoals vermeld; maak geen interpretaties.

Stap 2 — Locatie-hiërarchie toepassen
- Gebruik een vooraf bekende lijst met hoofdlocaties en hun sublocaties. Bijvoorbeeld:
  - Noord-Holland: Wijk aan Zee, IJmuiden, Zandvoort, Noordwijk, Wassenaar
  - Zuid-Holland: Hoek van Holland, Scheveningen, Kijkduin, Ouddorp, Maasvlakte, Zandmotor zuid
  - Zeeland: Domburg, Cadzand
  - Wadden: Texel, Vlieland, Terschelling, Ameland, Schiermonnikoog
  - België: Belgische spots
- Als een uitspraak over een hoofdlocatie gaat, koppel deze ook aan alle sublocaties, tenzij de
  tekst expliciet zegt dat de uitspraak niet voor een sublocatie geldt.

Stap 3 — Bundelen per locatie
- Combineer alle uitspraken die bij dezelfde locatie horen.
- Algemene uitspraken gelden als basis; specifieke (dagdeel/tijd) uitspraken vullen deze aan.
- Tegenstrijdige uitspraken noteer je in aparte records (met verschillend dagdeel of tijd).

Stap 4 — Vul de JSON-array
Maak voor elke unieke combinatie van Datum + Locatie + Dagdeel een JSON-object met exact deze velden in deze volgorde:
1. "Datum" — ISO-formaat YYYY-MM-DD (alleen invullen als expliciet genoemd of ondubbelzinnig af te leiden)
2. "Dag" — bijvoorbeeld "Dinsdag", "Woensdag"
3. "Locatie" — exacte naam uit de tekst (of sublocatie volgens hiërarchie)
4. "Dagdeel" — bijvoorbeeld "Ochtend", "Middag", "Avond" (alleen als expliciet genoemd)
5. "Wind" — exacte waarde zoals in de tekst, inclusief bft en tekens
6. "Wind richting" — exacte richting zoals in de tekst
7. "Getij " — exacte term zoals in de tekst
8. "Getij score" — bijvoorbeeld "Goed", "Medium"
9. "Golf hoogte" — exact zoals vermeld, bijv. "1-1,5m", "flat", "weinig", "heuphoogte"
10. "Clean" — "Ja", "Nee", of leeg als niet expliciet benoemd
11. "Swell" — exact zoals vermeld, bijv. "2m"
12. "Periode" — exact zoals vermeld
13. "Gaan Pro" — exacte tekst over aanbevolen tijden/condities voor ervaren surfers
14. "Gaan beginner" — idem voor beginners

Regels:
- Gebruik uitsluitend informatie die letterlijk in de tekst staat.
- Geen aannames of interpretaties toevoegen.
- Als een veld niet wordt genoemd: waarde = null.
- Splits records per locatie én per dagdeel.
- Neem tekstwaarden exact over, inclusief afkortingen, spaties en leestekens.
- Voeg geen extra context, uitleg of mening toe.
- Output moet uitsluitend een JSON-array zijn met bovenstaande velden in exact deze volgorde.

Invoer:
<{text}>

Uitvoer:
[JSON-array met gestructureerde gegevens]
"#;

const SUMMARY_TEMPLATE: &str = r#"Je krijgt hieronder een informeel geschreven surfweerbericht in het Nederlands.
De tekst bevat afkortingen, spreektaal en losse zinnen, maar bevat belangrijke informatie
over surfcondities op specifieke locaties, dagen en dagdelen in Nederland en België.

Je taak: Herschrijf dit bericht als een duidelijke surfverwachting in gewone, goed leesbare Nederlandse zinnen.

Opbouw:
- Groepeer eerst per locatie (regio of spot zoals genoemd in de tekst).
- Binnen elke locatie: groepeer per dag.
- Binnen elke dag: groepeer per dagdeel (ochtend, middag, avond), alleen als het dagdeel genoemd wordt.
- Noem per groep de genoemde gegevens: wind en windrichting, getij, golfhoogte, clean of niet,
  swell en periode, en het advies voor ervaren surfers en voor beginners.

Regels:
- Gebruik uitsluitend informatie die letterlijk in de tekst staat.
- Geen aannames, verwachtingen of interpretaties toevoegen.
- Laat gegevens die niet genoemd worden weg; vul niets aan.
- Neem waarden exact over, inclusief afkortingen en eenheden (zoals bft en m).
- Voeg geen extra context, uitleg of mening toe.
- Output is uitsluitend de herschreven verwachting, zonder inleiding of afsluiting.

Invoer:
<{text}>

Uitvoer:
[Surfverwachting per locatie, dag en dagdeel]
"#;

/// Which instruction template the completion service receives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptVariant {
    /// Ordered JSON array of 14-field location/day/time-of-day objects.
    #[default]
    Structured,
    /// Plain-language forecast grouped by location, day and time of day.
    Summary,
}

impl PromptVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptVariant::Structured => "structured",
            PromptVariant::Summary => "summary",
        }
    }

    fn template(&self) -> &'static str {
        match self {
            PromptVariant::Structured => STRUCTURED_TEMPLATE,
            PromptVariant::Summary => SUMMARY_TEMPLATE,
        }
    }

    /// Render the template around the raw message body. The body is inserted
    /// as-is; no escaping or trimming.
    pub fn render(&self, text: &str) -> String {
        self.template().replacen(INPUT_PLACEHOLDER, text, 1)
    }
}

impl fmt::Display for PromptVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown prompt variant '{0}' (expected 'structured' or 'summary')")]
pub struct UnknownVariant(pub String);

impl FromStr for PromptVariant {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "structured" => Ok(PromptVariant::Structured),
            "summary" => Ok(PromptVariant::Summary),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "wind 3bft, zaterdag ochtend clean";

    #[test]
    fn structured_lists_fields_in_order() {
        let prompt = PromptVariant::Structured.render(SAMPLE);
        let mut last = 0;
        for (i, field) in STRUCTURED_FIELDS.iter().enumerate() {
            let needle = format!("{}. \"{}\"", i + 1, field);
            let pos = prompt
                .find(&needle)
                .unwrap_or_else(|| panic!("missing field {}", needle));
            assert!(pos > last, "field {} out of order", field);
            last = pos;
        }
        assert!(prompt.contains("waarde = null"));
    }

    #[test]
    fn render_wraps_body_once() {
        for variant in [PromptVariant::Structured, PromptVariant::Summary] {
            let prompt = variant.render(SAMPLE);
            assert!(prompt.contains(&format!("Invoer:\n<{}>", SAMPLE)));
            assert!(!prompt.contains(INPUT_PLACEHOLDER));
        }
    }

    #[test]
    fn body_containing_placeholder_is_kept_verbatim() {
        let prompt = PromptVariant::Summary.render("letterlijk {text} in sms");
        assert!(prompt.contains("<letterlijk {text} in sms>"));
    }

    #[test]
    fn summary_groups_by_location_day_daypart() {
        let prompt = PromptVariant::Summary.render(SAMPLE);
        assert!(prompt.contains("per locatie"));
        assert!(prompt.contains("per dag"));
        assert!(prompt.contains("per dagdeel"));
        assert!(!prompt.contains("JSON"));
    }

    #[test]
    fn parse_variant() {
        assert_eq!("structured".parse::<PromptVariant>(), Ok(PromptVariant::Structured));
        assert_eq!(" Summary ".parse::<PromptVariant>(), Ok(PromptVariant::Summary));
        assert!("json".parse::<PromptVariant>().is_err());
        assert_eq!(PromptVariant::default(), PromptVariant::Structured);
        assert_eq!(PromptVariant::Summary.to_string(), "summary");
    }
}
