use serde::{Deserialize, Serialize};

/// One scraped organization. Every field is optional in the source markup;
/// a missing field is recorded as an empty string rather than aborting the run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub name: String,
    pub address: String,
    pub category: String,
    pub phone: String,
    /// Verification badge: "синяя", "зеленая", or empty.
    pub verified: String,
    /// "Хорошее место" award text, empty when absent.
    pub award: String,
    pub vk: String,
    pub telegram: String,
    pub whatsapp: String,
    pub website: String,
    pub card_url: String,
    pub rating: String,
    pub rating_count: String,
}

impl Organization {
    /// Column order of the output spreadsheet.
    pub const HEADERS: [&'static str; 13] = [
        "Название",
        "Адрес",
        "Категория",
        "Номер",
        "Галочка (синяя/зеленая/пусто)",
        "хорошее место",
        "ВК",
        "ТГ",
        "Ватсап",
        "сайт организации",
        "ссылка на карточку",
        "Рейтинг",
        "Кол-во оценок",
    ];

    /// Row values in the same order as [`Self::HEADERS`].
    pub fn row(&self) -> [&str; 13] {
        [
            &self.name,
            &self.address,
            &self.category,
            &self.phone,
            &self.verified,
            &self.award,
            &self.vk,
            &self.telegram,
            &self.whatsapp,
            &self.website,
            &self.card_url,
            &self.rating,
            &self.rating_count,
        ]
    }
}
