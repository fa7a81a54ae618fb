//! Canonical waiver wording.
//!
//! The built-in templates carry `{{...}}` placeholders and render through
//! the same path as externally authored templates.

use crate::model::{MediaRelease, TemplateBlock, WaiverSubmission, WaiverTemplate, WaiverType};

pub const DEFAULT_VERSION: &str = "v1.0";
pub const DEFAULT_EFFECTIVE_DATE: &str = "2024-05-28";

pub const PASSENGER_TITLE: &str = "Passenger Application Confidentiality and Application Agreement";
pub const REPRESENTATIVE_TITLE: &str = "Informed Consent for Legal Guardian/Power of Attorney";

pub const PASSENGER_SECTION_TITLE: &str = "Waiver of Liability";
pub const REPRESENTATIVE_SECTION_TITLE: &str = "Informed Consent";

pub const MEDIA_RELEASE_TITLE: &str = "Media Release";
pub const MEDIA_RELEASE_DESCRIPTION: &str = "Cycling Without Age Society occasionally takes photos/videos of their rides and passengers for the purpose of promoting their program on digital and print media including social networks, CWAS website, other news and advertising.";

/// Closing statement printed on passenger waivers only.
pub const ACKNOWLEDGMENT: &str = "My signature acknowledges that I am over the age of 18 and had sufficient time to read and understand this waiver. I have had the opportunity to seek my own legal advice and that I understand and agree to the conditions stated in this document and that they are binding on my heirs, next of kin, executors, administrators and successors.";

const PASSENGER_INTRO: &str = "I, {{firstName}} {{lastName}} of the town of {{town}}, have received, read and understand the Cycling Without Age Passenger Handbook and Confidentiality guidelines, and agree to abide by the procedures listed therein and I attest that all of the information I have provided herein is accurate and complete. I understand and agree that acceptance into the program is entirely at the discretion of the Cycling Without Age Society program coordinator.";

const REPRESENTATIVE_INTRO: &str = "I, {{representativeFirstName}} {{representativeLastName}}, the undersigned, attest that I am the Legal Guardian/Power of Attorney of {{firstName}} {{lastName}} of the town of {{town}}, who is taking part in the Cycling Without Age Program as a Passenger. I have received, read and understand the Cycling Without Age Passenger Handbook and Confidentiality guidelines, and agree to abide by the procedures listed therein. I attest that all of the information I have provided herein is accurate and complete. I understand and agree that acceptance into the program is entirely at the discretion of the Cycling Without Age Society program coordinator.";

const PASSENGER_CLAUSES: [&str; 4] = [
    "I, the undersigned, am the person named herein taking part in the Cycling Without Age Program as a passenger.",
    "I understand and agree that there are inherent risks associated with participation in this activity, that my participation is voluntary and that I am physically fit enough to participate in the activity.",
    "I accept all responsibility for my participation including the possibility of personal injury, death, property damage or any kind notwithstanding that the injury, loss may have been contributed to or occasioned by the negligence of the Cycling Without Age Society and its officers, directors, employed, members, agents, assigns, legal representative and successors.",
    "I do hereby indemnify and hold harmless the Cycling Without Age Society, its officers, directors, employees, members, agents, assigns, legal representatives and successors and any and all business associates and partners involved in the above noted activity and each of them, their owner, officers, and employees hereby waiving all claims for damage now or in the future arising from any loss, accident, injury or death which may be caused by or arise from participation of the individual named herein during this event; and agree to assume all risks for the activity noted above that the individual named herein has agreed to participate in.",
];

const REPRESENTATIVE_CLAUSES: [&str; 5] = [
    "I the undersigned attest that I am the Legal Guardian/Power of Attorney of the person named herein taking part in the Cycling Without Age Program as a Passenger.",
    "I understand and agree that there are inherent risks associated with participation in this activity, that participation is voluntary and that the participant is physically fit enough to participate in the activity.",
    "I accept all responsibility for their participation including the possibility of personal injury, death, property damage of any kind notwithstanding that the injury, loss may have been contributed to or occasioned by the negligence of the Cycling Without Age Society - Sidney and its officers, directors, employed, members, agents, assigns, legal representative, and successors.",
    "I do hereby indemnify and hold harmless the Cycling Without Age Society - Sidney, its officers, directors, employees, members, agents, assigns, legal representatives and successors and any and all business associates and partners involved in the above noted activity and each of them, their owner, officers, and employees hereby waiving all claims for damage now or in the future arising from any loss, accident, injury or death which may be caused by or arise from participation of the individual named herein during this event; and agree to assume all risks for the activity noted above that the individual named herein has agreed to participate in.",
    "My signature acknowledges that I have had sufficient time to read and understand this informed consent. By signing it I agree to the above conditions and allow the individual named herein to participate in the activity named. I understand that the conditions are binding on my heirs, next of kin, executors, administrators, and successors.",
];

/// The wording shipped with the application, as `[intro, title, clause..., media]`.
pub fn default_template(waiver_type: WaiverType) -> WaiverTemplate {
    let (title, intro, section, clauses): (&str, &str, &str, &[&str]) = match waiver_type {
        WaiverType::Passenger => (
            PASSENGER_TITLE,
            PASSENGER_INTRO,
            PASSENGER_SECTION_TITLE,
            &PASSENGER_CLAUSES,
        ),
        WaiverType::Representative => (
            REPRESENTATIVE_TITLE,
            REPRESENTATIVE_INTRO,
            REPRESENTATIVE_SECTION_TITLE,
            &REPRESENTATIVE_CLAUSES,
        ),
    };

    let mut blocks = Vec::with_capacity(clauses.len() + 3);
    blocks.push(TemplateBlock::new("intro", "Introduction", intro));
    blocks.push(TemplateBlock::new("sectionTitle", section, section));
    for (i, clause) in clauses.iter().enumerate() {
        let id = format!("clause{}", i + 1);
        blocks.push(TemplateBlock::new(&id, &format!("Clause {}", i + 1), clause));
    }
    blocks.push(TemplateBlock::new(
        "mediaRelease",
        MEDIA_RELEASE_TITLE,
        MEDIA_RELEASE_DESCRIPTION,
    ));

    WaiverTemplate {
        waiver_type,
        version: DEFAULT_VERSION.to_string(),
        effective_date: DEFAULT_EFFECTIVE_DATE.to_string(),
        title: title.to_string(),
        blocks,
    }
}

pub fn default_section_title(waiver_type: WaiverType) -> &'static str {
    match waiver_type {
        WaiverType::Passenger => PASSENGER_SECTION_TITLE,
        WaiverType::Representative => REPRESENTATIVE_SECTION_TITLE,
    }
}

/// The sentence recording the signer's media-release choice. Passenger
/// waivers speak in the first person; representative waivers name the
/// passenger.
pub fn media_release_sentence(
    option: MediaRelease,
    waiver_type: WaiverType,
    passenger_first_name: &str,
) -> String {
    let name = passenger_first_name.trim();
    if waiver_type == WaiverType::Passenger || name.is_empty() {
        return match option {
            MediaRelease::FullConsent => "I consent to Cycling Without Age Society using recordings of me participating in their program for the purposes listed above.".to_string(),
            MediaRelease::ConsentWithInitials => "I consent to Cycling Without Age Society using recordings of me participating in their program for the purposes listed above. However, I request that my full name not be shown, and I prefer to be identified by initials instead.".to_string(),
            MediaRelease::NoConsent => "I do not consent. Do not use my likeness in any manner.".to_string(),
        };
    }

    match option {
        MediaRelease::FullConsent => format!(
            "I consent to Cycling Without Age Society using recordings of {} participating in their program for the purposes listed above.",
            name
        ),
        MediaRelease::ConsentWithInitials => format!(
            "I consent to Cycling Without Age Society using recordings of {} participating in their program for the purposes listed above. However, I request that their full name not be shown, and they should be identified by initials instead.",
            name
        ),
        MediaRelease::NoConsent => format!(
            "I do not consent. Do not use {}'s likeness in any manner.",
            name
        ),
    }
}

/// Leading clause of the introduction that is set in bold.
pub fn intro_prefix(submission: &WaiverSubmission) -> String {
    let p = &submission.passenger;
    match (&submission.representative, submission.waiver_type) {
        (Some(rep), WaiverType::Representative) => format!(
            "I, {} {}, the undersigned, attest that I am the Legal Guardian/Power of Attorney of {} {} of the town of {},",
            rep.first_name, rep.last_name, p.first_name, p.last_name, p.town
        ),
        _ => format!(
            "I, {} {} of the town of {},",
            p.first_name, p.last_name, p.town
        ),
    }
}

/// Splits an interpolated introduction into its bold framing clause and
/// the remaining body. Returns `None` when the text does not open with
/// the canonical clause.
pub fn split_intro<'a>(intro: &'a str, prefix: &str) -> Option<(&'a str, &'a str)> {
    if prefix.is_empty() || !intro.starts_with(prefix) {
        return None;
    }
    let (head, rest) = intro.split_at(prefix.len());
    Some((head, rest.trim_start()))
}
