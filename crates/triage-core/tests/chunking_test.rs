use triage_core::{split_windows, ChunkWindow, KnowledgeChunk};

// ============ WINDOW CHUNKING TESTS ============

#[test]
fn test_thousand_chars_window_500_overlap_50() {
    let text: String = (0..1000).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
    let window = ChunkWindow::new(500, 50).unwrap();

    let windows = split_windows(&text, window);
    let spans: Vec<(usize, usize)> = windows.iter().map(|w| (w.start, w.end)).collect();

    assert_eq!(spans, vec![(0, 500), (450, 950), (900, 1000)]);
    assert_eq!(windows[1].text, text[450..950]);
    assert_eq!(windows[2].text.len(), 100);
}

#[test]
fn test_chunk_count_formula() {
    for (size, overlap) in [(500, 50), (100, 0), (10, 9), (64, 16)] {
        let window = ChunkWindow::new(size, overlap).unwrap();
        for len in [overlap + 1, size - 1, size, size + 1, 3 * size + 7, 1000] {
            if len <= overlap {
                continue;
            }
            let text = "x".repeat(len);
            let windows = split_windows(&text, window);

            let step = size - overlap;
            let expected = (len - overlap + step - 1) / step;
            assert_eq!(windows.len(), expected, "len={} size={} overlap={}", len, size, overlap);
            assert_eq!(window.expected_count(len), expected);

            // every window except the last is exactly `size` long
            for w in &windows[..windows.len() - 1] {
                assert_eq!(w.end - w.start, size);
            }
            assert_eq!(windows.last().unwrap().end, len);
        }
    }
}

#[test]
fn test_windows_cover_the_whole_text_with_overlap() {
    let text = "The quick brown fox jumps over the lazy dog. ".repeat(40);
    let window = ChunkWindow::new(120, 20).unwrap();
    let windows = split_windows(&text, window);

    assert_eq!(windows[0].start, 0);
    for pair in windows.windows(2) {
        assert_eq!(pair[0].end - pair[1].start, 20);
    }
}

#[test]
fn test_chunk_ids_are_stable_across_runs() {
    let text = "Restart the EDI adapter before replaying messages. ".repeat(50);
    let window = ChunkWindow::new(500, 50).unwrap();

    let first: Vec<KnowledgeChunk> = split_windows(&text, window).iter().map(KnowledgeChunk::guidance).collect();
    let second: Vec<KnowledgeChunk> = split_windows(&text, window).iter().map(KnowledgeChunk::guidance).collect();

    let ids: Vec<&str> = first.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids[0], "kb_0");
    assert_eq!(first, second);
}
