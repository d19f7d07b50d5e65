// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Offline text service with canned agricultural answers

use async_trait::async_trait;
use tracing::debug;

use super::{Language, TextService};

/// Topic a question is about, detected from keywords
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Treatment,
    Prevention,
    Fertilizer,
    Watering,
    Harvest,
    General,
}

/// Keyword groups checked in order; the first hit wins
const INTENT_KEYWORDS: &[(Intent, &[&str])] = &[
    (Intent::Treatment, &["treat", "cure", "medicine", "spray", "fungicide"]),
    (Intent::Prevention, &["prevent", "avoid", "stop", "control"]),
    (Intent::Fertilizer, &["fertilizer", "nutrition", "nutrient", "feed"]),
    (Intent::Watering, &["water", "irrigat", "wet"]),
    (Intent::Harvest, &["harvest", "pick", "collect", "when"]),
];

impl Intent {
    pub fn detect(question: &str) -> Self {
        let question = question.to_lowercase();
        INTENT_KEYWORDS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| question.contains(k)))
            .map(|(intent, _)| *intent)
            .unwrap_or(Intent::General)
    }

    pub fn answer(&self, language: Language) -> &'static str {
        match language {
            Language::En => match self {
                Intent::Treatment => "For treatment, consult with a local agricultural expert or extension officer. Consider using approved fungicides or pesticides as recommended for your specific crop and disease.",
                Intent::Prevention => "Prevention methods include proper crop rotation, adequate spacing between plants, avoiding overhead watering, and maintaining good field hygiene.",
                Intent::Fertilizer => "Use balanced NPK fertilizers according to soil test recommendations. Organic compost can also improve soil health and plant resistance.",
                Intent::Watering => "Water early morning or late evening. Avoid wetting the leaves to prevent fungal diseases. Ensure good drainage to prevent waterlogging.",
                Intent::Harvest => "Harvest when the crop reaches maturity. Check for proper color, firmness, and size indicators specific to your crop variety.",
                Intent::General => "I recommend consulting with a local agricultural extension officer or plant pathologist for specific guidance on your crop issue. They can provide tailored advice based on your local conditions.",
            },
            Language::Bn => match self {
                Intent::Treatment => "চিকিৎসার জন্য স্থানীয় কৃষি বিশেষজ্ঞ বা সম্প্রসারণ কর্মকর্তার সাথে পরামর্শ করুন। আপনার নির্দিষ্ট ফসল ও রোগের জন্য অনুমোদিত ছত্রাকনাশক বা কীটনাশক ব্যবহার করুন।",
                Intent::Prevention => "প্রতিরোধের উপায়গুলির মধ্যে রয়েছে সঠিক ফসল আবর্তন, গাছের মধ্যে পর্যাপ্ত দূরত্ব, মাথার উপর পানি দেওয়া এড়ানো এবং ক্ষেতের ভাল পরিচ্ছন্নতা বজায় রাখা।",
                Intent::Fertilizer => "মাটি পরীক্ষার সুপারিশ অনুযায়ী সুষম NPK সার ব্যবহার করুন। জৈব কম্পোস্ট মাটির স্বাস্থ্য ও গাছের প্রতিরোধ ক্ষমতা বৃদ্ধি করতে পারে।",
                Intent::Watering => "ভোর বেলা বা সন্ধ্যার পর পানি দিন। ছত্রাক রোগ প্রতিরোধের জন্য পাতা ভেজানো এড়িয়ে চলুন। জল জমা রোধের জন্য ভাল নিষ্কাশনের ব্যবস্থা নিশ্চিত করুন।",
                Intent::Harvest => "ফসল পরিপক্ক হলে সংগ্রহ করুন। আপনার ফসলের জাতের জন্য নির্দিষ্ট রঙ, দৃঢ়তা এবং আকারের সূচকগুলি পরীক্ষা করুন।",
                Intent::General => "আপনার ফসলের সমস্যার জন্য নির্দিষ্ট নির্দেশনার জন্য একজন স্থানীয় কৃষি সম্প্রসারণ কর্মকর্তা বা উদ্ভিদ রোগবিদের সাথে পরামর্শ করার পরামর্শ দিচ্ছি। তারা আপনার স্থানীয় পরিস্থিতির উপর ভিত্তি করে উপযুক্ত পরামর্শ প্রদান করতে পারেন।",
            },
        }
    }
}

/// Keyword-matched answers; translation is the identity
#[derive(Debug, Clone, Default)]
pub struct CannedTextService;

impl CannedTextService {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TextService for CannedTextService {
    async fn answer(&self, question: &str, _context: Option<&str>, language: Language) -> String {
        let intent = Intent::detect(question);
        debug!("Fallback answer for intent {:?} ({})", intent, language);
        intent.answer(language).to_string()
    }

    async fn translate(&self, text: &str, _target: Language) -> String {
        text.to_string()
    }

    fn name(&self) -> &'static str {
        "fallback"
    }
}
