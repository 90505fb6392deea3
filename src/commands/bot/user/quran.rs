use serde::Deserialize;

use crate::commands::prelude::*;
use crate::utils;
use crate::utils::prelude::*;

/// Editions requested from the api, arabic text first.
const EDITIONS: &str = "quran-uthmani,en.sahih";

#[derive(Debug, Deserialize)]
struct AyahResponse {
    code: u16,
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ayah {
    text: String,
    surah: Surah,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Surah {
    english_name: String,
}

/// A verse with its translation.
#[derive(Debug, PartialEq, Eq)]
struct Verse {
    surah_name: String,
    arabic: String,
    english: String,
}

/// Command: Look up a verse of the Quran.
pub struct Quran;

impl Quran {
    pub async fn slash(ctx: Context, req: SlashRequest) -> CommandResult {
        let (Some(surah), Some(ayah)) = (req.args.integer("surah"), req.args.integer("ayah")) else {
            return Err(CommandError::MissingArgs);
        };

        let url = format!(
            "{}/ayah/{surah}:{ayah}/editions/{EDITIONS}",
            ctx.config.quran_api.trim_end_matches('/')
        );

        // Unknown verses come back as a json error document.
        let body = ctx
            .web
            .get(&url)
            .send()
            .await?
            .json::<AyahResponse>()
            .await?;

        let Some(verse) = parse_verse(body)? else {
            return Ok(Response::CreateMessage(format!(
                "Ayah {surah}:{ayah} was not found."
            )));
        };

        let embed = utils::embed(
            ctx.config.colors.primary,
            format!("Ayah {surah}:{ayah} ({})", verse.surah_name),
        )?
        .description(format!("{}\n\n{}", verse.arabic, verse.english))
        .build();

        Ok(Response::Embed(embed))
    }
}

fn parse_verse(body: AyahResponse) -> AnyResult<Option<Verse>> {
    if body.code != 200 {
        debug!("Quran api replied {}: {}", body.code, body.data);
        return Ok(None);
    }

    let editions: Vec<Ayah> =
        serde_json::from_value(body.data).context("Unexpected Quran api response")?;

    let mut editions = editions.into_iter();
    let (Some(arabic), Some(english)) = (editions.next(), editions.next()) else {
        return Ok(None);
    };

    Ok(Some(Verse {
        surah_name: arabic.surah.english_name,
        arabic: arabic.text,
        english: english.text,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(json: &str) -> AyahResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn verse_with_translation() {
        let verse = parse_verse(body(
            r#"{
                "code": 200,
                "status": "OK",
                "data": [
                    { "number": 1, "text": "بِسْمِ ٱللَّهِ", "numberInSurah": 1,
                      "surah": { "number": 1, "englishName": "Al-Faatiha" } },
                    { "number": 1, "text": "In the name of Allah", "numberInSurah": 1,
                      "surah": { "number": 1, "englishName": "Al-Faatiha" } }
                ]
            }"#,
        ))
        .unwrap();

        assert_eq!(
            verse,
            Some(Verse {
                surah_name: "Al-Faatiha".to_string(),
                arabic: "بِسْمِ ٱللَّهِ".to_string(),
                english: "In the name of Allah".to_string(),
            })
        );
    }

    #[test]
    fn unknown_verse() {
        let verse = parse_verse(body(
            r#"{ "code": 404, "status": "NOT FOUND", "data": "Please specify a valid surah reference." }"#,
        ))
        .unwrap();

        assert_eq!(verse, None);
    }
}
