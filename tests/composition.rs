// Composition tests: verifying that the offline stages chain together.
//
//   posts -> Normalizer -> documents -> Dictionary -> LDA -> prepare -> HTML
//
// No network access; walls are built in memory.

use serde_json::json;

use walltopics::output::html::render;
use walltopics::pipeline::analyze::{analyze, normalize_walls, AnalyzeOptions};
use walltopics::pipeline::fetch::SavedWall;
use walltopics::text::lemmatize::{Lemmatizer, SnowballLemmatizer};
use walltopics::text::normalize::Normalizer;
use walltopics::topics::dictionary::DocumentMode;
use walltopics::topics::lda::LdaConfig;

fn wall(name: &str, texts: &[&str]) -> SavedWall {
    let posts = texts
        .iter()
        .enumerate()
        .map(|(i, t)| serde_json::from_value(json!({"id": i, "text": t})).unwrap())
        .collect();
    SavedWall::new(name, posts)
}

fn university_wall() -> SavedWall {
    wall(
        "itmoru",
        &[
            "Студенты университета сдают экзамены и защищают дипломы https://itmo.ru",
            "Университет открывает новую лабораторию для студентов #ИТМО",
            "Экзамены студентов начнутся в январе, университет публикует расписание",
            "Лаборатория университета приглашает студентов на стажировку",
            "Дипломы выпускникам университета вручат в июне 🎓",
            "Расписание экзаменов для студентов опубликовано",
        ],
    )
}

fn dota_wall() -> SavedWall {
    wall(
        "dotatoday",
        &[
            "Команда выиграла турнир и забрала призовой фонд!!!",
            "Турнир по доте: команда проиграла финал",
            "Новый патч меняет героев, команда готовит стратегию",
            "Герои патча: кто сильнее на турнире?",
            "Призовой фонд турнира вырос до рекордных значений",
            "Команда объявила состав на турнир #dota2",
        ],
    )
}

#[test]
fn normalized_walls_drop_links_tags_and_stop_words() {
    let normalizer = Normalizer::default();
    let walls = vec![university_wall()];
    let normalized = normalize_walls(&normalizer, &walls, 100);

    assert_eq!(normalized.len(), 1);
    assert_eq!(normalized[0].len(), 6);

    let all: Vec<&String> = normalized[0].iter().flatten().collect();
    assert!(!all.is_empty());
    assert!(all.iter().all(|t| !t.contains("itmo") && !t.contains("итмо")));
    assert!(all.iter().all(|t| t.as_str() != "и" && t.as_str() != "в"));
}

#[test]
fn posts_per_wall_limits_input() {
    let normalizer = Normalizer::default();
    let walls = vec![university_wall(), dota_wall()];
    let normalized = normalize_walls(&normalizer, &walls, 2);
    assert!(normalized.iter().all(|posts| posts.len() == 2));
}

#[test]
fn combined_mode_builds_one_document() {
    let normalizer = Normalizer::default();
    let walls = vec![university_wall(), dota_wall()];
    let options = AnalyzeOptions {
        posts_per_wall: 100,
        documents: DocumentMode::Combined,
        lda: LdaConfig::new(3).iterations(50).seed(11),
        ..Default::default()
    };

    let vis = analyze(&normalizer, &walls, &options).unwrap();

    assert_eq!(vis.num_documents, 1);
    assert_eq!(vis.topics.len(), 3);
    let total: f64 = vis.topics.iter().map(|t| t.prevalence).sum();
    assert!((total - 1.0).abs() < 1e-9, "prevalences sum to {total}");
    // Ranked by prevalence
    for pair in vis.topics.windows(2) {
        assert!(pair[0].prevalence >= pair[1].prevalence);
    }
    let ranks: Vec<usize> = vis.topics.iter().map(|t| t.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3]);
}

#[test]
fn per_post_topics_separate_unrelated_walls() {
    let normalizer = Normalizer::default();
    let walls = vec![university_wall(), dota_wall()];
    let options = AnalyzeOptions {
        posts_per_wall: 100,
        documents: DocumentMode::PerPost,
        lda: LdaConfig::new(2).iterations(300).seed(5).alpha(0.1),
        ..Default::default()
    };

    let vis = analyze(&normalizer, &walls, &options).unwrap();
    assert_eq!(vis.num_documents, 12);

    let lem = SnowballLemmatizer::default();
    let university = lem.lemma("университета");
    let tournament = lem.lemma("турнир");

    let topic_of = |term: &str| {
        vis.topics
            .iter()
            .max_by(|a, b| {
                let pa = a.terms.iter().find(|t| t.term == term).map_or(0.0, |t| t.prob);
                let pb = b.terms.iter().find(|t| t.term == term).map_or(0.0, |t| t.prob);
                pa.partial_cmp(&pb).unwrap()
            })
            .map(|t| t.model_index)
            .unwrap()
    };

    assert_ne!(
        topic_of(&university),
        topic_of(&tournament),
        "university and tournament words should land in different topics"
    );
}

#[test]
fn relevance_terms_are_bounded_and_ranked() {
    let normalizer = Normalizer::default();
    let walls = vec![university_wall(), dota_wall()];
    let options = AnalyzeOptions {
        posts_per_wall: 100,
        documents: DocumentMode::PerWall,
        lda: LdaConfig::new(2).iterations(50).seed(2),
        ..Default::default()
    };

    let vis = analyze(&normalizer, &walls, &options).unwrap();

    for topic in &vis.topics {
        assert!(!topic.terms.is_empty());
        let top = topic.top_relevant(vis.lambda, vis.terms_per_topic);
        assert!(top.len() <= vis.terms_per_topic);
        for pair in top.windows(2) {
            assert!(pair[0].relevance(vis.lambda) >= pair[1].relevance(vis.lambda));
        }
        assert!(topic.terms.iter().all(|t| t.freq <= t.total as f64 + 1e-9));
    }
    assert!(!vis.salient.is_empty());
    assert!(vis
        .salient
        .iter()
        .all(|t| t.documents >= 1 && t.documents <= vis.num_documents));
}

#[test]
fn empty_walls_are_an_error() {
    let normalizer = Normalizer::default();
    let walls = vec![wall("empty", &["https://vk.com #тег 12345 !!!"])];
    let err = analyze(&normalizer, &walls, &AnalyzeOptions::default()).unwrap_err();
    assert!(err.to_string().contains("No words left"));
}

#[test]
fn full_chain_renders_html() {
    let normalizer = Normalizer::default();
    let walls = vec![university_wall(), dota_wall()];
    let options = AnalyzeOptions {
        lda: LdaConfig::new(3).iterations(30).seed(1),
        ..Default::default()
    };

    let vis = analyze(&normalizer, &walls, &options).unwrap();
    let html = render(&vis).unwrap();

    assert!(html.contains("Intertopic distance map"));
    assert!(html.contains("\"topics\":["));
    assert!(html.contains(&format!("{} topics", vis.topics.len())));
}
